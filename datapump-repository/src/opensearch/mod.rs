//! OpenSearch implementation of the document store.
//!
//! This module provides a concrete implementation of `DocumentStore`
//! using OpenSearch (or a wire-compatible Elasticsearch) as the backend.

mod client;
mod requests;

pub use client::OpenSearchStore;
