//! Document store error types.
//!
//! Every variant here is fatal for an ingestion run: the pipeline cannot
//! guarantee its settings bracket once one of these surfaces. Per-document
//! write failures are not errors; they are reported inside a
//! [`BulkResponse`](crate::types::BulkResponse).

use thiserror::Error;

/// Errors that can occur while talking to the document store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Failed to establish connection to the store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to check whether an index exists.
    #[error("Index check error: {0}")]
    IndexCheckError(String),

    /// Failed to create an index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to delete an index.
    #[error("Index deletion error: {0}")]
    IndexDeletionError(String),

    /// Failed to apply index settings.
    #[error("Settings error: {0}")]
    SettingsError(String),

    /// The bulk request as a whole failed.
    #[error("Bulk request error: {0}")]
    BulkError(String),

    /// Failed to query node information.
    #[error("Node info error: {0}")]
    NodeInfoError(String),

    /// The store reported a version string that is not dot-separated integers.
    #[error("Invalid store version: {0:?}")]
    InvalidVersion(String),

    /// The index did not reach the expected health in time.
    #[error("Cluster health error: {0}")]
    HealthError(String),

    /// Failed to parse a response from the store.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl StoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index check error.
    pub fn index_check(msg: impl Into<String>) -> Self {
        Self::IndexCheckError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create an index deletion error.
    pub fn index_deletion(msg: impl Into<String>) -> Self {
        Self::IndexDeletionError(msg.into())
    }

    /// Create a settings error.
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::SettingsError(msg.into())
    }

    /// Create a bulk request error.
    pub fn bulk(msg: impl Into<String>) -> Self {
        Self::BulkError(msg.into())
    }

    /// Create a node info error.
    pub fn node_info(msg: impl Into<String>) -> Self {
        Self::NodeInfoError(msg.into())
    }

    /// Create an invalid version error.
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion(version.into())
    }

    /// Create a cluster health error.
    pub fn health(msg: impl Into<String>) -> Self {
        Self::HealthError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}
