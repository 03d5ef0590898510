//! Orchestrator for the datapump pipeline.
//!
//! Brackets one bulk load: prepares the index, drives the bulk processor
//! from the record stream and restores durable settings once every worker
//! has drained.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use datapump_repository::{DocumentStore, IndexManager};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::loader::BulkProcessor;
use crate::stats::AggregateStats;
use crate::stream::{record_stream, Record, RecordReceiver, RecordSender};

/// Outcome of a completed ingestion run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Target index.
    pub index: String,
    /// Documents received from the record stream.
    pub records: u64,
    /// Statistics accumulated by the bulk workers.
    pub stats: AggregateStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// The statistics snapshot taken after all workers stopped.
    pub fn snapshot(&self) -> &AggregateStats {
        &self.stats
    }

    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Resolves once a run has fully shut down.
///
/// The run has drained every batch, stopped its workers and restored
/// durable index settings by the time [`Completion::wait`] returns `Ok`.
pub struct Completion {
    task: JoinHandle<Result<RunReport, PipelineError>>,
}

impl Completion {
    /// Wait for the run to finish.
    pub async fn wait(self) -> Result<RunReport, PipelineError> {
        self.task.await?
    }
}

/// Runs one ingestion into a single index.
///
/// # Example
///
/// ```ignore
/// let pump = Datapump::new(store, manager, PipelineConfig::new("books"));
/// let (records, completion) = pump.start().await?;
/// records.send_document("1", json!({"title": "Dune"})).await?;
/// records.finish().await?;
/// let report = completion.wait().await?;
/// ```
pub struct Datapump {
    store: Arc<dyn DocumentStore>,
    index_manager: Arc<IndexManager>,
    config: PipelineConfig,
}

impl Datapump {
    /// Create a pipeline run.
    ///
    /// # Arguments
    ///
    /// * `store` - Store client shared by the bulk workers
    /// * `index_manager` - Index lifecycle manager for the same store
    /// * `config` - Run configuration
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index_manager: Arc<IndexManager>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            index_manager,
            config,
        }
    }

    /// Prepare the index and start consuming records.
    ///
    /// The index is created if missing and switched to transient settings
    /// before this returns; a failure in either step is returned here and no
    /// record is ever consumed. The caller sends documents on the returned
    /// sender, ends with [`RecordSender::finish`] and then waits on the
    /// [`Completion`].
    pub async fn start(self) -> Result<(RecordSender, Completion), PipelineError> {
        self.config.validate()?;

        let span = self
            .config
            .span
            .clone()
            .unwrap_or_else(|| info_span!("datapump", index = %self.config.index_name));

        prepare_index(&self.index_manager, &self.config.index_name)
            .instrument(span.clone())
            .await?;

        let (sender, records) = record_stream(self.config.channel_capacity);
        let task = tokio::spawn(self.run(records).instrument(span));

        Ok((sender, Completion { task }))
    }

    async fn run(self, mut records: RecordReceiver) -> Result<RunReport, PipelineError> {
        let started_at = Utc::now();
        let index = self.config.index_name.clone();
        info!(workers = self.config.worker_count, "Starting bulk load");

        let mut processor = BulkProcessor::start(self.store.clone(), &self.config);
        let intake = consume(&mut records, &mut processor, self.config.flush_every).await;
        drop(records);

        let drained = drain(processor).await;

        // Restored whatever happened above; the index must not stay
        // write-optimised.
        let restored = self.index_manager.apply_durable_settings(&index).await;
        if let Err(ref e) = restored {
            error!(error = %e, "Failed to restore durable settings");
        }

        let records = intake?;
        let stats = drained?;
        restored?;

        stats.log_summary();
        let report = RunReport {
            index,
            records,
            stats,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            records = report.records,
            failed = report.stats.failed,
            elapsed_ms = report.elapsed().num_milliseconds(),
            "Bulk load complete"
        );
        Ok(report)
    }
}

async fn prepare_index(manager: &IndexManager, index: &str) -> Result<(), PipelineError> {
    manager.ensure_index_exists(index).await?;
    manager.apply_transient_settings(index).await?;
    Ok(())
}

/// Feed records to the processor until the stream ends. Returns the number
/// of documents received.
async fn consume(
    records: &mut RecordReceiver,
    processor: &mut BulkProcessor,
    flush_every: usize,
) -> Result<u64, PipelineError> {
    let flush_every = flush_every.max(1) as u64;
    let mut received: u64 = 0;

    loop {
        match records.recv().await {
            Some(Record::Document(document)) => {
                processor.add(document).await?;
                received += 1;
                if received % flush_every == 0 {
                    processor.flush().await?;
                    debug!(records = received, "Periodic flush");
                }
            }
            Some(Record::EndOfStream) => {
                debug!(records = received, "End of stream");
                break;
            }
            None => {
                warn!(
                    records = received,
                    "Record stream closed without end-of-stream marker"
                );
                break;
            }
        }
    }

    Ok(received)
}

/// Final flush then close, closing the workers even if the flush failed.
async fn drain(mut processor: BulkProcessor) -> Result<AggregateStats, PipelineError> {
    let flushed = processor.flush().await;
    let closed = processor.close().await;
    flushed?;
    closed
}
