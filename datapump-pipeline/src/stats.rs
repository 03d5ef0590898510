//! Statistics aggregation for the bulk processor.
//!
//! Every worker owns one [`WorkerStats`] and is the only task writing to
//! it. The counters are merged into an [`AggregateStats`] snapshot once all
//! workers have been joined, so a snapshot never races in-flight writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use datapump_repository::BulkResponse;
use tracing::info;

/// Counters of a single worker.
#[derive(Debug, Default)]
pub(crate) struct WorkerStats {
    queued: AtomicU64,
    last_duration_micros: AtomicU64,
    batches: AtomicU64,
    committed: AtomicU64,
    indexed: AtomicU64,
    created: AtomicU64,
    updated: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl WorkerStats {
    /// Count documents handed to this worker.
    pub(crate) fn record_queued(&self, count: usize) {
        self.queued.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a completed dispatch of `count` documents.
    ///
    /// `response` is `None` when the bulk request failed as a whole, in which
    /// case every document of the batch counts as failed.
    pub(crate) fn record_dispatch(
        &self,
        count: usize,
        response: Option<&BulkResponse>,
        elapsed: Duration,
    ) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.last_duration_micros.store(micros, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.committed.fetch_add(count as u64, Ordering::Relaxed);

        let Some(response) = response else {
            self.failed.fetch_add(count as u64, Ordering::Relaxed);
            return;
        };

        for item in &response.items {
            if item.is_index() {
                self.indexed.fetch_add(1, Ordering::Relaxed);
            }
            if item.is_created() {
                self.created.fetch_add(1, Ordering::Relaxed);
            } else if item.is_updated() {
                self.updated.fetch_add(1, Ordering::Relaxed);
            }
            if item.is_success() {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
            } else {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        // Items the store never reported on did not make it.
        let missing = count.saturating_sub(response.items.len());
        self.failed.fetch_add(missing as u64, Ordering::Relaxed);
    }
}

/// Per-worker view in a stats snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerCounters {
    /// Documents handed to the worker over the run.
    pub queued: u64,
    /// Round-trip time of the worker's last bulk request.
    pub last_duration: Duration,
}

/// Statistics of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Explicit flushes, periodic and final.
    pub flushed: u64,
    /// Bulk requests sent by workers.
    pub batches: u64,
    /// Documents workers handed to the store.
    pub committed: u64,
    /// Items the store reported as index actions.
    pub indexed: u64,
    /// Items that created a new document.
    pub created: u64,
    /// Items that replaced an existing document.
    pub updated: u64,
    /// Items the store accepted.
    pub succeeded: u64,
    /// Items the store rejected or never received.
    pub failed: u64,
    /// One entry per worker, in worker order.
    pub workers: Vec<WorkerCounters>,
}

impl AggregateStats {
    /// Merge worker counters into a snapshot.
    pub(crate) fn collect<'a>(
        flushed: u64,
        workers: impl IntoIterator<Item = &'a WorkerStats>,
    ) -> Self {
        let mut stats = AggregateStats {
            flushed,
            ..Default::default()
        };

        for worker in workers {
            stats.batches += worker.batches.load(Ordering::Relaxed);
            stats.committed += worker.committed.load(Ordering::Relaxed);
            stats.indexed += worker.indexed.load(Ordering::Relaxed);
            stats.created += worker.created.load(Ordering::Relaxed);
            stats.updated += worker.updated.load(Ordering::Relaxed);
            stats.succeeded += worker.succeeded.load(Ordering::Relaxed);
            stats.failed += worker.failed.load(Ordering::Relaxed);
            stats.workers.push(WorkerCounters {
                queued: worker.queued.load(Ordering::Relaxed),
                last_duration: Duration::from_micros(
                    worker.last_duration_micros.load(Ordering::Relaxed),
                ),
            });
        }

        stats
    }

    /// Log the snapshot, one line per counter and per worker.
    pub fn log_summary(&self) {
        info!(count = self.flushed, "Number of times flush has been invoked");
        info!(count = self.batches, "Number of bulk requests sent");
        info!(count = self.committed, "Number of requests committed by workers");
        info!(count = self.indexed, "Number of requests indexed");
        info!(count = self.created, "Number of requests reported as created");
        info!(count = self.updated, "Number of requests reported as updated");
        info!(count = self.succeeded, "Number of requests reported as success");
        info!(count = self.failed, "Number of requests reported as failed");

        for (worker, counters) in self.workers.iter().enumerate() {
            info!(
                worker,
                queued = counters.queued,
                last_duration = ?counters.last_duration,
                "Worker stats"
            );
        }
    }
}
