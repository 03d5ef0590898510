//! Error types for the datapump pipeline.

use datapump_repository::StoreError;
use thiserror::Error;

/// Errors that abort an ingestion run.
///
/// Per-document write failures never show up here; they are counted in the
/// run's statistics instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The pipeline configuration is unusable.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Error from the document store.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// A bulk worker task failed.
    #[error("Worker error: {0}")]
    WorkerError(String),
}

impl PipelineError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }

    /// Create a worker error.
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::WorkerError(msg.into())
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::WorkerError(err.to_string())
    }
}
