//! Interface definitions for the document store.
//!
//! This module defines the abstract `DocumentStore` trait so the pipeline
//! and the index manager can run against OpenSearch or a test double.

mod document_store;

pub use document_store::DocumentStore;
