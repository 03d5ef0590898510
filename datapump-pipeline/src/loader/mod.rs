//! Bulk loader for the datapump pipeline.
//!
//! Accumulates documents into bulk requests and dispatches them across a
//! fixed pool of persistent workers.

mod worker;

use std::sync::Arc;

use datapump_repository::{BulkOperation, DocumentStore};
use futures::future::join_all;
use tokio::sync::mpsc::error::{SendError, TrySendError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::stats::{AggregateStats, WorkerStats};
use crate::stream::Document;
use worker::{BulkWorker, WorkerCommand};

/// Batches one worker may have waiting behind the one it is sending.
const WORKER_QUEUE_DEPTH: usize = 1;

struct WorkerHandle {
    commands: mpsc::Sender<WorkerCommand>,
    task: JoinHandle<()>,
    stats: Arc<WorkerStats>,
}

/// Batches documents and dispatches them concurrently.
///
/// The processor is driven by a single task: `add` appends to the pending
/// batch and hands it to a worker once `max_batch_actions` or
/// `max_batch_bytes` is reached. Handing off only waits when every worker
/// already has a batch queued.
///
/// # Example
///
/// ```ignore
/// let mut processor = BulkProcessor::start(store, &config);
/// processor.add(Document::new("1", json!({"title": "Dune"}))).await?;
/// processor.flush().await?;
/// let stats = processor.close().await?;
/// ```
pub struct BulkProcessor {
    index: String,
    document_type: Option<String>,
    max_actions: usize,
    max_bytes: usize,
    pending: Vec<BulkOperation>,
    pending_bytes: usize,
    workers: Vec<WorkerHandle>,
    next_worker: usize,
    flushed: u64,
}

impl BulkProcessor {
    /// Spawn `config.worker_count` workers sharing `store`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(store: Arc<dyn DocumentStore>, config: &PipelineConfig) -> Self {
        let worker_count = config.worker_count.max(1);
        let workers = (0..worker_count)
            .map(|id| {
                let (commands, rx) = mpsc::channel(WORKER_QUEUE_DEPTH);
                let stats = Arc::new(WorkerStats::default());
                let task = BulkWorker::spawn(id, store.clone(), stats.clone(), rx);
                WorkerHandle {
                    commands,
                    task,
                    stats,
                }
            })
            .collect();

        info!(
            index = %config.index_name,
            workers = worker_count,
            max_batch_actions = config.max_batch_actions,
            max_batch_bytes = config.max_batch_bytes,
            "Started bulk processor"
        );

        Self {
            index: config.index_name.clone(),
            document_type: config.document_type.clone(),
            max_actions: config.max_batch_actions.max(1),
            max_bytes: config.max_batch_bytes,
            pending: Vec::with_capacity(config.max_batch_actions),
            pending_bytes: 0,
            workers,
            next_worker: 0,
            flushed: 0,
        }
    }

    /// Queue a document write, dispatching the pending batch if it is full.
    pub async fn add(&mut self, document: Document) -> Result<(), PipelineError> {
        let mut operation = BulkOperation::index(&self.index, document.uid, document.payload);
        if let Some(ref document_type) = self.document_type {
            operation = operation.with_doc_type(document_type);
        }

        self.pending_bytes += operation.size_bytes();
        self.pending.push(operation);

        if self.batch_is_full() {
            self.dispatch_pending().await?;
        }
        Ok(())
    }

    /// Number of documents waiting in the pending batch.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Dispatch the pending batch and wait until every batch handed to a
    /// worker so far has been answered by the store.
    ///
    /// A stopped worker does not cut the wait short: every live worker is
    /// drained before the error is returned.
    #[instrument(skip(self), fields(index = %self.index))]
    pub async fn flush(&mut self) -> Result<(), PipelineError> {
        let dispatched = self.dispatch_pending().await;

        let mut stopped = Vec::new();
        let mut acks = Vec::with_capacity(self.workers.len());
        for (id, worker) in self.workers.iter().enumerate() {
            let (ack, done) = oneshot::channel();
            match worker.commands.send(WorkerCommand::Drain(ack)).await {
                Ok(()) => acks.push((id, done)),
                Err(_) => stopped.push(id),
            }
        }

        // A drain queued just as its worker died is never answered, so the
        // worker's queue closing counts as a failed drain.
        let waits = acks.into_iter().map(|(id, done)| {
            let commands = &self.workers[id].commands;
            async move {
                let drained = tokio::select! {
                    biased;
                    ack = done => ack.is_ok(),
                    _ = commands.closed() => false,
                };
                (id, drained)
            }
        });
        for (id, drained) in join_all(waits).await {
            if !drained {
                stopped.push(id);
            }
        }

        dispatched?;
        if !stopped.is_empty() {
            stopped.sort_unstable();
            return Err(PipelineError::worker(format!(
                "bulk workers {:?} stopped before draining",
                stopped
            )));
        }

        self.flushed += 1;
        debug!(flushed = self.flushed, "Bulk processor flushed");
        Ok(())
    }

    /// Stop all workers once their queued batches are sent, wait for them to
    /// exit and return the run's statistics.
    ///
    /// A pending partial batch is dispatched first. Every worker is joined
    /// before any error is returned, so no bulk request is still in flight
    /// when this returns. No documents can be added afterwards.
    pub async fn close(mut self) -> Result<AggregateStats, PipelineError> {
        let dispatched = self.dispatch_pending().await;

        let Self {
            workers, flushed, ..
        } = self;

        let mut tasks = Vec::with_capacity(workers.len());
        let mut stats = Vec::with_capacity(workers.len());
        for WorkerHandle {
            commands,
            task,
            stats: worker_stats,
        } in workers
        {
            // Closing the queue lets the worker finish what it has and exit.
            drop(commands);
            tasks.push(task);
            stats.push(worker_stats);
        }

        let joined = join_all(tasks).await;

        let snapshot = AggregateStats::collect(flushed, stats.iter().map(Arc::as_ref));
        info!(
            committed = snapshot.committed,
            failed = snapshot.failed,
            "Bulk processor closed"
        );

        dispatched?;
        for (id, result) in joined.into_iter().enumerate() {
            result.map_err(|e| PipelineError::worker(format!("bulk worker {} failed: {}", id, e)))?;
        }
        Ok(snapshot)
    }

    fn batch_is_full(&self) -> bool {
        self.pending.len() >= self.max_actions
            || (self.max_bytes > 0 && self.pending_bytes >= self.max_bytes)
    }

    async fn dispatch_pending(&mut self) -> Result<(), PipelineError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.max_actions));
        self.pending_bytes = 0;
        self.hand_off(batch).await
    }

    /// Give the batch to the first worker, in round-robin order, that has
    /// room for it; if all are busy, wait on the next live one in turn.
    /// Stopped workers are skipped.
    async fn hand_off(&mut self, batch: Vec<BulkOperation>) -> Result<(), PipelineError> {
        let worker_count = self.workers.len();
        let mut command = WorkerCommand::Dispatch(batch);

        for offset in 0..worker_count {
            let id = (self.next_worker + offset) % worker_count;
            match self.workers[id].commands.try_send(command) {
                Ok(()) => {
                    self.next_worker = (id + 1) % worker_count;
                    return Ok(());
                }
                Err(TrySendError::Full(returned)) => command = returned,
                Err(TrySendError::Closed(returned)) => {
                    warn!(worker = id, "Bulk worker stopped, skipping it");
                    command = returned;
                }
            }
        }

        for offset in 0..worker_count {
            let id = (self.next_worker + offset) % worker_count;
            match self.workers[id].commands.send(command).await {
                Ok(()) => {
                    self.next_worker = (id + 1) % worker_count;
                    return Ok(());
                }
                Err(SendError(returned)) => command = returned,
            }
        }

        Err(PipelineError::worker("every bulk worker has stopped"))
    }
}
