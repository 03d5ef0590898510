//! # Datapump Repository
//!
//! This crate provides the document store boundary for the bulk loader:
//! error types, the `DocumentStore` interface, typed index settings, store
//! version handling, the `IndexManager` that brackets a bulk load, and a
//! concrete implementation for OpenSearch.

pub mod config;
pub mod errors;
pub mod index_manager;
pub mod interfaces;
pub mod opensearch;
pub mod settings;
pub mod types;
pub mod version;

pub use config::IndexManagerConfig;
pub use errors::StoreError;
pub use index_manager::{CreateFlags, IndexManager};
pub use interfaces::DocumentStore;
pub use opensearch::OpenSearchStore;
pub use settings::{IndexSettings, RefreshInterval, Setting, TranslogDurability};
pub use types::{BulkItemOutcome, BulkOperation, BulkResponse};
pub use version::StoreVersion;
