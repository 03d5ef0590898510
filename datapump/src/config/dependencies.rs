//! Dependency initialization and wiring for datapump.

use std::sync::Arc;

use datapump_pipeline::{Datapump, PipelineConfig};
use datapump_repository::{DocumentStore, IndexManager, OpenSearchStore};
use tracing::info;

use crate::config::Settings;
use crate::DatapumpError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// Store client shared by the bulk workers.
    pub store: Arc<dyn DocumentStore>,
    /// Index lifecycle manager for the same store.
    pub index_manager: Arc<IndexManager>,
}

impl Dependencies {
    /// Connect to the store and detect its version.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(DatapumpError)` - If the store is unreachable or reports an
    ///   unusable version
    pub async fn new(settings: &Settings) -> Result<Self, DatapumpError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            index = %settings.index_name,
            "Initializing dependencies"
        );

        let store: Arc<dyn DocumentStore> = Arc::new(
            OpenSearchStore::new(&settings.opensearch_url)
                .await
                .map_err(|e| {
                    DatapumpError::config(format!("Failed to create OpenSearch client: {}", e))
                })?,
        );

        // Version detection doubles as the connectivity check.
        let index_manager =
            IndexManager::new(store.clone(), settings.index_settings.clone()).await?;

        info!(version = %index_manager.version(), "OpenSearch connection verified");

        Ok(Self {
            store,
            index_manager: Arc::new(index_manager),
        })
    }

    /// Build a pipeline run over these dependencies.
    pub fn pipeline(&self, config: PipelineConfig) -> Datapump {
        Datapump::new(self.store.clone(), self.index_manager.clone(), config)
    }
}
