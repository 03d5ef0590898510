//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `DocumentStore`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesFlushParts,
        IndicesGetParts, IndicesPutSettingsParts,
    },
    nodes::NodesInfoParts,
    params::WaitForStatus,
    BulkParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::StoreError;
use crate::interfaces::DocumentStore;
use crate::opensearch::requests;
use crate::settings::IndexSettings;
use crate::types::{BulkOperation, BulkResponse};

/// OpenSearch-backed document store.
///
/// One instance owns one connection pool and is shared by every bulk worker
/// of an ingestion run.
///
/// # Example
///
/// ```ignore
/// let store = OpenSearchStore::new("http://localhost:9200").await?;
/// let version = store.detect_version().await?;
/// ```
pub struct OpenSearchStore {
    client: OpenSearch,
    url: Url,
}

impl OpenSearchStore {
    /// Create a new store client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchStore)` - A new client instance
    /// * `Err(StoreError)` - If the URL is invalid or the transport cannot be built
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let parsed_url = Url::parse(url).map_err(|e| StoreError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url.clone());
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| StoreError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %parsed_url, "Created OpenSearch client");

        Ok(Self {
            client,
            url: parsed_url,
        })
    }

    /// The URL this client talks to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Read a JSON body from a successful response, or turn the response
    /// into an error built by `make_err`.
    async fn json_body(
        response: Response,
        make_err: fn(String) -> StoreError,
    ) -> Result<Value, StoreError> {
        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Request failed");
            return Err(make_err(format!(
                "request failed with status {}: {}",
                status, error_body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for OpenSearchStore {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| StoreError::index_check(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(StoreError::index_check(format!(
                "unexpected status {} checking index {:?}",
                status, index
            ))),
        }
    }

    #[instrument(skip(self, settings, mappings))]
    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
        mappings: Option<&Value>,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(requests::create_index_body(settings, mappings))
            .send()
            .await
            .map_err(|e| StoreError::index_creation(e.to_string()))?;

        let body = Self::json_body(response, StoreError::IndexCreationError).await?;
        if !requests::is_acknowledged(&body) {
            return Err(StoreError::index_creation(format!(
                "creation of index {:?} was not acknowledged",
                index
            )));
        }

        debug!(index = %index, "Index created");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| StoreError::index_deletion(e.to_string()))?;

        // 404 is acceptable - index may not exist
        if response.status_code().as_u16() == 404 {
            return Ok(false);
        }

        Self::json_body(response, StoreError::IndexDeletionError).await?;
        Ok(true)
    }

    async fn index_names(&self) -> Result<Vec<String>, StoreError> {
        let response = self
            .client
            .indices()
            .get(IndicesGetParts::Index(&["*"]))
            .ignore_unavailable(true)
            .send()
            .await
            .map_err(|e| StoreError::index_check(e.to_string()))?;

        let body = Self::json_body(response, StoreError::IndexCheckError).await?;
        Ok(requests::parse_index_names(&body))
    }

    #[instrument(skip(self, settings))]
    async fn put_index_settings(
        &self,
        index: &str,
        settings: &IndexSettings,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&[index]))
            .body(settings.to_request_body())
            .send()
            .await
            .map_err(|e| StoreError::settings(e.to_string()))?;

        let body = Self::json_body(response, StoreError::SettingsError).await?;
        if !requests::is_acknowledged(&body) {
            return Err(StoreError::settings(format!(
                "settings update of index {:?} was not acknowledged",
                index
            )));
        }

        debug!(index = %index, "Index settings updated");
        Ok(())
    }

    async fn flush_index(&self, index: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .flush(IndicesFlushParts::Index(&[index]))
            .ignore_unavailable(true)
            .send()
            .await
            .map_err(|e| StoreError::settings(e.to_string()))?;

        Self::json_body(response, StoreError::SettingsError).await?;
        Ok(())
    }

    async fn wait_for_yellow(&self, index: &str, timeout: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::Index(&[index]))
            .wait_for_status(WaitForStatus::Yellow)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| StoreError::health(e.to_string()))?;

        let body = Self::json_body(response, StoreError::HealthError).await?;
        if requests::health_timed_out(&body) {
            return Err(StoreError::health(format!(
                "index {:?} did not turn yellow within {}",
                index, timeout
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, operations), fields(count = operations.len()))]
    async fn bulk_write(&self, operations: &[BulkOperation]) -> Result<BulkResponse, StoreError> {
        if operations.is_empty() {
            return Ok(BulkResponse::default());
        }

        let body: Vec<JsonBody<Value>> = requests::bulk_lines(operations)
            .into_iter()
            .map(JsonBody::from)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::bulk(e.to_string()))?;

        let body = Self::json_body(response, StoreError::BulkError).await?;
        requests::parse_bulk_response(&body)
    }

    async fn detect_version(&self) -> Result<String, StoreError> {
        let response = self
            .client
            .nodes()
            .info(NodesInfoParts::NodeId(&["_local"]))
            .send()
            .await
            .map_err(|e| StoreError::node_info(e.to_string()))?;

        let body = Self::json_body(response, StoreError::NodeInfoError).await?;
        requests::parse_node_version(&body)
    }
}
