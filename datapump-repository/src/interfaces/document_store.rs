//! Document store trait definition.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;
use crate::settings::IndexSettings;
use crate::types::{BulkOperation, BulkResponse};

/// Abstract interface for the remote document store.
///
/// This is the complete set of store operations the bulk loader relies on.
/// Implementations must be `Send + Sync` so one client can be shared by all
/// bulk workers of a run.
///
/// # Error Handling
///
/// A returned `Err` means the operation itself could not be carried out.
/// Rejections of individual documents inside a bulk request are not errors;
/// they are reported as failed items of the [`BulkResponse`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError>;

    /// Create an index.
    ///
    /// # Arguments
    ///
    /// * `index` - Name of the index to create
    /// * `settings` - Index settings; an empty set uses the store defaults
    /// * `mappings` - Optional mappings; `None` uses dynamic mapping
    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
        mappings: Option<&Value>,
    ) -> Result<(), StoreError>;

    /// Delete an index.
    ///
    /// Returns `Ok(false)` if the index did not exist.
    async fn delete_index(&self, index: &str) -> Result<bool, StoreError>;

    /// List the names of all indexes.
    async fn index_names(&self) -> Result<Vec<String>, StoreError>;

    /// Apply settings to an existing index. Succeeds only when the store
    /// acknowledges the update.
    async fn put_index_settings(
        &self,
        index: &str,
        settings: &IndexSettings,
    ) -> Result<(), StoreError>;

    /// Flush an index to durable storage.
    async fn flush_index(&self, index: &str) -> Result<(), StoreError>;

    /// Wait until the index reaches at least yellow health.
    async fn wait_for_yellow(&self, index: &str, timeout: &str) -> Result<(), StoreError>;

    /// Send a batch of writes as one bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkResponse)` - One outcome per operation, in request order
    /// * `Err(StoreError)` - If the request as a whole failed
    async fn bulk_write(&self, operations: &[BulkOperation]) -> Result<BulkResponse, StoreError>;

    /// Report the version string of the node this client talks to.
    async fn detect_version(&self) -> Result<String, StoreError>;
}
