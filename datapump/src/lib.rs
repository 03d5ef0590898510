//! # Datapump
//!
//! Pumps newline-delimited JSON documents into an OpenSearch index through
//! the bulk ingestion pipeline.
//!
//! This crate provides the environment configuration, dependency wiring and
//! record source used by the `datapump` binary.

pub mod config;
pub mod source;

pub use config::{Dependencies, Input, Settings};
pub use source::{NdjsonSource, SourceSummary};

use thiserror::Error;

/// Errors that can occur while setting up or running a load.
#[derive(Error, Debug)]
pub enum DatapumpError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] datapump_pipeline::PipelineError),

    /// Document store error.
    #[error("Store error: {0}")]
    StoreError(#[from] datapump_repository::StoreError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DatapumpError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
