//! Configuration types for the IndexManager.

use crate::settings::PERMANENT_REPLICA_COUNT;

/// Configuration for the IndexManager.
#[derive(Debug, Clone)]
pub struct IndexManagerConfig {
    /// Replica count applied when an index is made permanent.
    pub permanent_replicas: u32,
    /// How long to wait for a freshly created index to turn yellow,
    /// in store duration syntax.
    pub health_timeout: String,
}

impl Default for IndexManagerConfig {
    fn default() -> Self {
        Self {
            permanent_replicas: PERMANENT_REPLICA_COUNT,
            health_timeout: "30s".to_string(),
        }
    }
}

impl IndexManagerConfig {
    /// Create a config with a custom permanent replica count.
    pub fn with_permanent_replicas(mut self, replicas: u32) -> Self {
        self.permanent_replicas = replicas;
        self
    }
}
