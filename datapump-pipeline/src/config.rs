//! Pipeline configuration.

use tracing::Span;

use crate::errors::PipelineError;

/// Default number of actions per bulk request.
pub const DEFAULT_MAX_BATCH_ACTIONS: usize = 1000;

/// Default size limit of a bulk request in bytes.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 5 * 1024 * 1024;

/// Default number of records between forced flushes.
pub const DEFAULT_FLUSH_EVERY: usize = 100_000;

/// Configuration for one ingestion run. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target index.
    pub index_name: String,
    /// Legacy mapping type attached to every write, if any.
    pub document_type: Option<String>,
    /// Number of actions that triggers dispatch of the pending batch.
    pub max_batch_actions: usize,
    /// Size in bytes that triggers dispatch of the pending batch. `0`
    /// disables the size threshold.
    pub max_batch_bytes: usize,
    /// Number of concurrent bulk workers.
    pub worker_count: usize,
    /// Force a flush every this many records, bounding how much data can sit
    /// undispatched behind a slow producer.
    pub flush_every: usize,
    /// Capacity of the record stream buffer.
    pub channel_capacity: usize,
    /// Span the run's consumer task executes in. Defaults to a `datapump`
    /// span tagged with the index name.
    pub span: Option<Span>,
}

impl PipelineConfig {
    /// Create a config for the given index with default tuning.
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            document_type: None,
            max_batch_actions: DEFAULT_MAX_BATCH_ACTIONS,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            worker_count: 1,
            flush_every: DEFAULT_FLUSH_EVERY,
            channel_capacity: 1000,
            span: None,
        }
    }

    /// Set the mapping type.
    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    /// Set the action threshold.
    pub fn with_max_batch_actions(mut self, max_batch_actions: usize) -> Self {
        self.max_batch_actions = max_batch_actions;
        self
    }

    /// Set the size threshold in bytes.
    pub fn with_max_batch_bytes(mut self, max_batch_bytes: usize) -> Self {
        self.max_batch_bytes = max_batch_bytes;
        self
    }

    /// Set the number of workers.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the forced flush period, in records.
    pub fn with_flush_every(mut self, flush_every: usize) -> Self {
        self.flush_every = flush_every;
        self
    }

    /// Set the record stream capacity.
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Run the pipeline inside the given span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Check the configuration before a run starts.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.index_name.trim().is_empty() {
            return Err(PipelineError::config("index name must not be empty"));
        }
        if self.max_batch_actions == 0 {
            return Err(PipelineError::config("max_batch_actions must be at least 1"));
        }
        if self.worker_count == 0 {
            return Err(PipelineError::config("worker_count must be at least 1"));
        }
        if self.flush_every == 0 {
            return Err(PipelineError::config("flush_every must be at least 1"));
        }
        if self.channel_capacity == 0 {
            return Err(PipelineError::config("channel_capacity must be at least 1"));
        }
        Ok(())
    }
}
