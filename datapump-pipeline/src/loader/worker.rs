//! Bulk worker task.

use std::sync::Arc;
use std::time::Instant;

use datapump_repository::{BulkOperation, DocumentStore};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::stats::WorkerStats;

/// Failed items logged individually per batch; the rest are only counted.
const MAX_LOGGED_FAILURES: usize = 5;

/// Work handed to a bulk worker.
#[derive(Debug)]
pub(crate) enum WorkerCommand {
    /// Send the batch as one bulk request.
    Dispatch(Vec<BulkOperation>),
    /// Acknowledge once every command queued before this one is done.
    Drain(oneshot::Sender<()>),
}

/// A persistent task that sends batches to the store one at a time.
pub(crate) struct BulkWorker {
    id: usize,
    store: Arc<dyn DocumentStore>,
    stats: Arc<WorkerStats>,
    commands: mpsc::Receiver<WorkerCommand>,
}

impl BulkWorker {
    pub(crate) fn spawn(
        id: usize,
        store: Arc<dyn DocumentStore>,
        stats: Arc<WorkerStats>,
        commands: mpsc::Receiver<WorkerCommand>,
    ) -> JoinHandle<()> {
        let worker = Self {
            id,
            store,
            stats,
            commands,
        };
        tokio::spawn(worker.run())
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                WorkerCommand::Dispatch(batch) => self.dispatch(batch).await,
                WorkerCommand::Drain(ack) => {
                    // The flusher may have given up waiting; nothing to do then.
                    let _ = ack.send(());
                }
            }
        }
        debug!(worker = self.id, "Bulk worker stopped");
    }

    /// Send one batch. Failures are counted and logged, never propagated, so
    /// one bad batch cannot stop the other workers or the intake side.
    async fn dispatch(&self, batch: Vec<BulkOperation>) {
        let count = batch.len();
        self.stats.record_queued(count);

        let started = Instant::now();
        let result = self.store.bulk_write(&batch).await;
        let elapsed = started.elapsed();

        match result {
            Ok(response) if response.errors => {
                let mut failed = 0;
                for item in response.failed_items() {
                    if failed < MAX_LOGGED_FAILURES {
                        warn!(
                            worker = self.id,
                            id = %item.id,
                            status = item.status,
                            error = item.error.as_deref().unwrap_or("unknown"),
                            "Document rejected"
                        );
                    }
                    failed += 1;
                }
                error!(worker = self.id, failed, count, "Bulk request had failures");
                self.stats.record_dispatch(count, Some(&response), elapsed);
            }
            Ok(response) => {
                debug!(
                    worker = self.id,
                    count,
                    took_ms = response.took_ms,
                    elapsed = ?elapsed,
                    "Bulk request committed"
                );
                self.stats.record_dispatch(count, Some(&response), elapsed);
            }
            Err(e) => {
                error!(worker = self.id, count, error = %e, "Bulk error");
                self.stats.record_dispatch(count, None, elapsed);
            }
        }
    }
}
