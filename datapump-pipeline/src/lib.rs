//! # Datapump Pipeline
//!
//! Bulk ingestion of a stream of documents into one search index.
//!
//! ## Architecture
//!
//! 1. **Stream**: ordered, bounded record channel from the producer
//! 2. **Loader**: batches documents and dispatches them on a worker pool
//! 3. **Stats**: per-worker counters merged into one snapshot per run
//! 4. **Orchestrator**: brackets the load with transient and durable index
//!    settings and signals completion

pub mod config;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod stats;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::PipelineConfig;
pub use errors::PipelineError;
pub use loader::BulkProcessor;
pub use orchestrator::{Completion, Datapump, RunReport};
pub use stats::{AggregateStats, WorkerCounters};
pub use stream::{record_stream, Document, Record, RecordReceiver, RecordSender};
