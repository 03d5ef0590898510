//! Error types for the datapump repository.

mod store_error;

pub use store_error::StoreError;
