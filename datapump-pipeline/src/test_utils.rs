//! In-memory document store for pipeline tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use datapump_repository::{
    BulkItemOutcome, BulkOperation, BulkResponse, DocumentStore, IndexSettings, StoreError,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing_subscriber::registry::{LookupSpan, Registry};

/// A store call, in the order the store saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    CreateIndex(String),
    PutSettings(Value),
    Bulk(usize),
}

/// Records every call and answers bulk writes from memory.
pub struct RecordingStore {
    index_exists: AtomicBool,
    fail_index_check: bool,
    fail_settings_from: Option<usize>,
    settings_calls: AtomicUsize,
    fail_bulk_requests: bool,
    panic_on_id: Option<String>,
    rejected_ids: HashSet<String>,
    delay: Option<Duration>,
    events: Mutex<Vec<StoreEvent>>,
    settings_spans: Mutex<Vec<Vec<String>>>,
    operations: Mutex<Vec<BulkOperation>>,
    documents_written: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            index_exists: AtomicBool::new(false),
            fail_index_check: false,
            fail_settings_from: None,
            settings_calls: AtomicUsize::new(0),
            fail_bulk_requests: false,
            panic_on_id: None,
            rejected_ids: HashSet::new(),
            delay: None,
            events: Mutex::new(Vec::new()),
            settings_spans: Mutex::new(Vec::new()),
            operations: Mutex::new(Vec::new()),
            documents_written: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_existing_index(self) -> Self {
        self.index_exists.store(true, Ordering::SeqCst);
        self
    }

    /// Sleep this long inside every bulk write.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reject the documents with these ids inside otherwise successful bulks.
    pub fn rejecting<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.rejected_ids = ids.into_iter().map(str::to_string).collect();
        self
    }

    pub fn failing_bulk_requests(mut self) -> Self {
        self.fail_bulk_requests = true;
        self
    }

    pub fn failing_index_check(mut self) -> Self {
        self.fail_index_check = true;
        self
    }

    /// Panic inside the bulk write of any batch holding this id.
    pub fn panicking_on(mut self, id: &str) -> Self {
        self.panic_on_id = Some(id.to_string());
        self
    }

    pub fn failing_settings(mut self) -> Self {
        self.fail_settings_from = Some(0);
        self
    }

    /// Accept the first settings update, fail every later one.
    pub fn failing_settings_after_first(mut self) -> Self {
        self.fail_settings_from = Some(1);
        self
    }

    pub async fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().await.clone()
    }

    /// Sizes of the bulk requests received, in arrival order.
    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                StoreEvent::Bulk(size) => Some(*size),
                _ => None,
            })
            .collect()
    }

    /// Refresh interval values written through settings updates, in order.
    pub async fn refresh_updates(&self) -> Vec<Value> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                StoreEvent::PutSettings(body) => Some(body["index"]["refresh_interval"].clone()),
                _ => None,
            })
            .collect()
    }

    /// For every accepted settings update, the names of the spans it ran
    /// in, innermost first. Empty unless a `Registry` is the default
    /// subscriber.
    pub async fn settings_spans(&self) -> Vec<Vec<String>> {
        self.settings_spans.lock().await.clone()
    }

    pub async fn operations(&self) -> Vec<BulkOperation> {
        self.operations.lock().await.clone()
    }

    pub fn documents_written(&self) -> usize {
        self.documents_written.load(Ordering::SeqCst)
    }

    /// Highest number of bulk writes observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn index_exists(&self, _index: &str) -> Result<bool, StoreError> {
        if self.fail_index_check {
            return Err(StoreError::index_check("cluster unreachable"));
        }
        Ok(self.index_exists.load(Ordering::SeqCst))
    }

    async fn create_index(
        &self,
        index: &str,
        _settings: &IndexSettings,
        _mappings: Option<&Value>,
    ) -> Result<(), StoreError> {
        self.events
            .lock()
            .await
            .push(StoreEvent::CreateIndex(index.to_string()));
        self.index_exists.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_index(&self, _index: &str) -> Result<bool, StoreError> {
        Ok(self.index_exists.swap(false, Ordering::SeqCst))
    }

    async fn index_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    async fn put_index_settings(
        &self,
        _index: &str,
        settings: &IndexSettings,
    ) -> Result<(), StoreError> {
        let call = self.settings_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_settings_from.is_some_and(|from| call >= from) {
            return Err(StoreError::settings("not acknowledged"));
        }
        self.settings_spans.lock().await.push(current_span_names());
        self.events
            .lock()
            .await
            .push(StoreEvent::PutSettings(settings.to_request_body()));
        Ok(())
    }

    async fn flush_index(&self, _index: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn wait_for_yellow(&self, _index: &str, _timeout: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn bulk_write(&self, operations: &[BulkOperation]) -> Result<BulkResponse, StoreError> {
        if let Some(ref id) = self.panic_on_id {
            if operations.iter().any(|op| &op.id == id) {
                panic!("bulk write of document {} blew up", id);
            }
        }

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.events
            .lock()
            .await
            .push(StoreEvent::Bulk(operations.len()));
        self.operations
            .lock()
            .await
            .extend(operations.iter().cloned());
        self.documents_written
            .fetch_add(operations.len(), Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_bulk_requests {
            return Err(StoreError::bulk("connection reset"));
        }

        let items: Vec<BulkItemOutcome> = operations
            .iter()
            .map(|op| {
                let rejected = self.rejected_ids.contains(&op.id);
                BulkItemOutcome {
                    action: "index".to_string(),
                    id: op.id.clone(),
                    status: if rejected { 400 } else { 201 },
                    result: (!rejected).then(|| "created".to_string()),
                    error: rejected.then(|| "mapper_parsing_exception: failed to parse".to_string()),
                }
            })
            .collect();

        Ok(BulkResponse {
            took_ms: 1,
            errors: items.iter().any(|item| !item.is_success()),
            items,
        })
    }

    async fn detect_version(&self) -> Result<String, StoreError> {
        Ok("7.10.2".to_string())
    }
}

/// Names of the current span and its ancestors, innermost first.
fn current_span_names() -> Vec<String> {
    let Some(id) = tracing::Span::current().id() else {
        return Vec::new();
    };

    tracing::dispatcher::get_default(|dispatch| {
        dispatch
            .downcast_ref::<Registry>()
            .and_then(|registry| registry.span(&id))
            .map(|span| span.scope().map(|s| s.name().to_string()).collect())
            .unwrap_or_default()
    })
}
