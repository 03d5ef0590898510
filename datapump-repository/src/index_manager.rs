//! Index lifecycle management.
//!
//! The `IndexManager` brackets a bulk load: it makes sure the target index
//! exists, switches it into a write-optimised state before documents flow
//! and back into a durable state afterwards. It also carries the
//! finalisation operations used to promote a temporary index.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::config::IndexManagerConfig;
use crate::errors::StoreError;
use crate::interfaces::DocumentStore;
use crate::settings::{IndexSettings, RefreshInterval, DEFAULT_REFRESH_INTERVAL};
use crate::version::StoreVersion;

/// Flags for [`IndexManager::create`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateFlags {
    /// Create the index with write-optimised settings: no replicas, no
    /// refresh and asynchronous translog durability.
    pub temporary: bool,
}

/// Query the store for its version and parse it.
///
/// A version string that is not dot-separated integers is an error: the
/// durable settings computation branches on it.
pub async fn detect_version(store: &dyn DocumentStore) -> Result<StoreVersion, StoreError> {
    let raw = store.detect_version().await?;
    let version = raw.parse::<StoreVersion>()?;
    debug!(version = %version, "Detected store version");
    Ok(version)
}

/// Manages index existence and settings on the document store.
pub struct IndexManager {
    store: Arc<dyn DocumentStore>,
    index_settings: IndexSettings,
    version: StoreVersion,
    config: IndexManagerConfig,
}

impl IndexManager {
    /// Create a manager with default configuration, detecting the store
    /// version once.
    ///
    /// # Arguments
    ///
    /// * `store` - The document store client
    /// * `index_settings` - User-supplied index settings
    pub async fn new(
        store: Arc<dyn DocumentStore>,
        index_settings: IndexSettings,
    ) -> Result<Self, StoreError> {
        Self::with_config(store, index_settings, IndexManagerConfig::default()).await
    }

    /// Create a manager with custom configuration.
    pub async fn with_config(
        store: Arc<dyn DocumentStore>,
        index_settings: IndexSettings,
        config: IndexManagerConfig,
    ) -> Result<Self, StoreError> {
        let version = detect_version(store.as_ref()).await?;

        info!(version = %version, "Created index manager");

        Ok(Self {
            store,
            index_settings,
            version,
            config,
        })
    }

    /// The detected store version.
    pub fn version(&self) -> &StoreVersion {
        &self.version
    }

    /// Create the index if it does not exist yet. A no-op otherwise.
    #[instrument(skip(self))]
    pub async fn ensure_index_exists(&self, index: &str) -> Result<(), StoreError> {
        if self.store.index_exists(index).await? {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }

        self.store
            .create_index(index, &self.index_settings, None)
            .await?;
        info!(index = %index, "Created index");
        Ok(())
    }

    /// Disable automatic refresh ahead of a bulk load.
    #[instrument(skip(self))]
    pub async fn apply_transient_settings(&self, index: &str) -> Result<(), StoreError> {
        self.store
            .put_index_settings(index, &IndexSettings::refresh_only(RefreshInterval::Disabled))
            .await?;
        debug!(index = %index, "Disabled refresh interval");
        Ok(())
    }

    /// Restore the steady-state refresh interval after a bulk load.
    #[instrument(skip(self))]
    pub async fn apply_durable_settings(&self, index: &str) -> Result<(), StoreError> {
        let interval = RefreshInterval::Interval(DEFAULT_REFRESH_INTERVAL.to_string());
        self.store
            .put_index_settings(index, &IndexSettings::refresh_only(interval))
            .await?;
        info!(index = %index, interval = DEFAULT_REFRESH_INTERVAL, "Reset refresh interval");
        Ok(())
    }

    /// Create a new index and wait for it to become usable.
    ///
    /// # Arguments
    ///
    /// * `index` - Name of the index
    /// * `flags` - Whether to create a write-optimised temporary index
    /// * `mappings` - Optional index mappings
    #[instrument(skip(self, mappings))]
    pub async fn create(
        &self,
        index: &str,
        flags: CreateFlags,
        mappings: Option<&Value>,
    ) -> Result<(), StoreError> {
        info!(index = %index, temporary = flags.temporary, "Creating index");

        let settings = if flags.temporary {
            self.index_settings.merge(&IndexSettings::temporary())
        } else {
            self.index_settings.clone()
        };

        if let Err(e) = self.store.create_index(index, &settings, mappings).await {
            error!(index = %index, error = %e, "Could not create index");
            return Err(e);
        }

        info!(index = %index, "Waiting for newly created index");
        self.store
            .wait_for_yellow(index, &self.config.health_timeout)
            .await
            .map_err(|e| {
                StoreError::health(format!(
                    "created index {:?}, but it did not turn yellow or green: {}",
                    index, e
                ))
            })?;

        info!(index = %index, "Created index");
        Ok(())
    }

    /// Delete an index. A missing index is not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, index: &str) -> Result<(), StoreError> {
        if self.store.delete_index(index).await? {
            info!(index = %index, "Deleted index");
        } else {
            info!(index = %index, "Index did not exist");
        }
        Ok(())
    }

    /// Promote a temporary index to a permanent one and flush it.
    #[instrument(skip(self))]
    pub async fn make_permanent(&self, index: &str) -> Result<(), StoreError> {
        info!(index = %index, "Finalizing settings of index");
        self.store
            .put_index_settings(index, &self.permanent_settings())
            .await?;

        info!(index = %index, "Flushing index");
        if let Err(e) = self.store.flush_index(index).await {
            warn!(index = %index, error = %e, "Unable to flush index, ignoring");
        }
        Ok(())
    }

    /// The durable settings `make_permanent` applies for this store version.
    pub fn permanent_settings(&self) -> IndexSettings {
        IndexSettings::durable(
            &IndexSettings::default(),
            &self.index_settings,
            &self.version,
            self.config.permanent_replicas,
        )
    }

    /// Names of all existing indexes.
    pub async fn index_names(&self) -> Result<Vec<String>, StoreError> {
        self.store.index_names().await
    }

    /// Whether an index exists.
    pub async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        self.store.index_exists(index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Setting;
    use crate::types::{BulkOperation, BulkResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Exists(String),
        Create(String, Value),
        Delete(String),
        PutSettings(String, Value),
        Flush(String),
        WaitYellow(String),
    }

    /// Mock store for testing
    struct MockStore {
        version: String,
        indexes: Mutex<HashSet<String>>,
        calls: Mutex<Vec<Call>>,
        fail_create: bool,
        fail_flush: bool,
    }

    impl MockStore {
        fn new(version: &str) -> Self {
            Self {
                version: version.to_string(),
                indexes: Mutex::new(HashSet::new()),
                calls: Mutex::new(Vec::new()),
                fail_create: false,
                fail_flush: false,
            }
        }

        async fn with_index(self, index: &str) -> Self {
            self.indexes.lock().await.insert(index.to_string());
            self
        }

        async fn calls(&self) -> Vec<Call> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl DocumentStore for MockStore {
        async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
            self.calls.lock().await.push(Call::Exists(index.to_string()));
            Ok(self.indexes.lock().await.contains(index))
        }

        async fn create_index(
            &self,
            index: &str,
            settings: &IndexSettings,
            _mappings: Option<&Value>,
        ) -> Result<(), StoreError> {
            if self.fail_create {
                return Err(StoreError::index_creation("Mock failure"));
            }
            self.calls
                .lock()
                .await
                .push(Call::Create(index.to_string(), settings.to_json()));
            self.indexes.lock().await.insert(index.to_string());
            Ok(())
        }

        async fn delete_index(&self, index: &str) -> Result<bool, StoreError> {
            self.calls.lock().await.push(Call::Delete(index.to_string()));
            Ok(self.indexes.lock().await.remove(index))
        }

        async fn index_names(&self) -> Result<Vec<String>, StoreError> {
            Ok(self.indexes.lock().await.iter().cloned().collect())
        }

        async fn put_index_settings(
            &self,
            index: &str,
            settings: &IndexSettings,
        ) -> Result<(), StoreError> {
            self.calls
                .lock()
                .await
                .push(Call::PutSettings(index.to_string(), settings.to_json()));
            Ok(())
        }

        async fn flush_index(&self, index: &str) -> Result<(), StoreError> {
            self.calls.lock().await.push(Call::Flush(index.to_string()));
            if self.fail_flush {
                return Err(StoreError::settings("Mock failure"));
            }
            Ok(())
        }

        async fn wait_for_yellow(&self, index: &str, _timeout: &str) -> Result<(), StoreError> {
            self.calls
                .lock()
                .await
                .push(Call::WaitYellow(index.to_string()));
            Ok(())
        }

        async fn bulk_write(
            &self,
            _operations: &[BulkOperation],
        ) -> Result<BulkResponse, StoreError> {
            Ok(BulkResponse::default())
        }

        async fn detect_version(&self) -> Result<String, StoreError> {
            Ok(self.version.clone())
        }
    }

    async fn manager(store: Arc<MockStore>, settings: IndexSettings) -> IndexManager {
        IndexManager::new(store, settings).await.unwrap()
    }

    #[tokio::test]
    async fn test_ensure_index_creates_missing_index() {
        let store = Arc::new(MockStore::new("5.6.2"));
        let manager = manager(store.clone(), IndexSettings::default()).await;

        manager.ensure_index_exists("books").await.unwrap();

        let calls = store.calls().await;
        assert_eq!(calls[0], Call::Exists("books".to_string()));
        assert_eq!(calls[1], Call::Create("books".to_string(), json!({})));
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let store = Arc::new(MockStore::new("5.6.2").with_index("books").await);
        let manager = manager(store.clone(), IndexSettings::default()).await;

        manager.ensure_index_exists("books").await.unwrap();
        manager.ensure_index_exists("books").await.unwrap();

        let calls = store.calls().await;
        assert!(calls.iter().all(|c| matches!(c, Call::Exists(_))));
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_ensure_index_propagates_create_failure() {
        let mut store = MockStore::new("5.6.2");
        store.fail_create = true;
        let manager = manager(Arc::new(store), IndexSettings::default()).await;

        let result = manager.ensure_index_exists("books").await;

        assert!(matches!(result, Err(StoreError::IndexCreationError(_))));
    }

    #[tokio::test]
    async fn test_transient_then_durable_refresh_interval() {
        let store = Arc::new(MockStore::new("7.10.2").with_index("books").await);
        let manager = manager(store.clone(), IndexSettings::default()).await;

        manager.apply_transient_settings("books").await.unwrap();
        manager.apply_durable_settings("books").await.unwrap();

        let calls = store.calls().await;
        assert_eq!(
            calls,
            vec![
                Call::PutSettings("books".to_string(), json!({"refresh_interval": "-1"})),
                Call::PutSettings("books".to_string(), json!({"refresh_interval": "1s"})),
            ]
        );
    }

    #[tokio::test]
    async fn test_new_rejects_malformed_version() {
        let store = Arc::new(MockStore::new("bad.version"));

        let result = IndexManager::new(store, IndexSettings::default()).await;

        assert!(matches!(result, Err(StoreError::InvalidVersion(_))));
    }

    #[tokio::test]
    async fn test_create_temporary_index_waits_for_health() {
        let store = Arc::new(MockStore::new("6.0.0"));
        let user = IndexSettings::from_json(&json!({"number_of_shards": 2})).unwrap();
        let manager = manager(store.clone(), user).await;

        manager
            .create("books", CreateFlags { temporary: true }, None)
            .await
            .unwrap();

        let calls = store.calls().await;
        match &calls[0] {
            Call::Create(index, settings) => {
                assert_eq!(index, "books");
                assert_eq!(settings["number_of_shards"], 2);
                assert_eq!(settings["number_of_replicas"], 0);
                assert_eq!(settings["refresh_interval"], "-1");
                assert_eq!(settings["translog"]["durability"], "async");
            }
            other => panic!("unexpected call {:?}", other),
        }
        assert_eq!(calls[1], Call::WaitYellow("books".to_string()));
    }

    #[tokio::test]
    async fn test_make_permanent_ignores_flush_failure() {
        let mut store = MockStore::new("5.0.0");
        store.fail_flush = true;
        let store = Arc::new(store);
        let user = IndexSettings::from_json(&json!({"number_of_shards": 2, "B": 2})).unwrap();
        let manager = manager(store.clone(), user).await;

        manager.make_permanent("books").await.unwrap();

        let calls = store.calls().await;
        match &calls[0] {
            Call::PutSettings(_, settings) => {
                assert_eq!(settings["number_of_replicas"], 5);
                assert_eq!(settings["B"], 2);
                assert!(settings.get("number_of_shards").is_none());
                assert!(settings["refresh_interval"].is_null());
            }
            other => panic!("unexpected call {:?}", other),
        }
        assert_eq!(calls[1], Call::Flush("books".to_string()));
    }

    #[tokio::test]
    async fn test_permanent_settings_respect_config() {
        let store = Arc::new(MockStore::new("2.4.6"));
        let config = IndexManagerConfig::default().with_permanent_replicas(2);
        let manager = IndexManager::with_config(store, IndexSettings::default(), config)
            .await
            .unwrap();

        let settings = manager.permanent_settings();

        assert_eq!(settings.number_of_replicas, Setting::Value(2));
        assert_eq!(
            settings.refresh_interval,
            Setting::Value(RefreshInterval::Interval("1s".to_string()))
        );
    }

    #[tokio::test]
    async fn test_delete_missing_index_is_ok() {
        let store = Arc::new(MockStore::new("5.6.2").with_index("old").await);
        let manager = manager(store.clone(), IndexSettings::default()).await;

        manager.delete("missing").await.unwrap();
        manager.delete("old").await.unwrap();

        assert!(!manager.index_exists("old").await.unwrap());
        assert!(manager.index_names().await.unwrap().is_empty());
    }
}
