use crate::formatter::{document_level, Document, DocumentFormatter};
use crate::record::{Level, LogRecord};
use crate::store::{DocumentStore, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// Buffering behavior of a [`BufferedHandler`]. Immutable after
/// construction.
#[derive(Clone, Debug)]
pub struct BufferConfig {
    /// Buffer length that triggers a flush on append.
    pub capacity: usize,
    /// Records at or above this severity flush the buffer immediately.
    pub early_flush_level: Level,
    /// Interval between timer-driven flushes. `None` or zero disables the
    /// background timer; buffered records then wait for a capacity or
    /// severity trigger.
    pub flush_interval: Option<Duration>,
    /// Swallow connection errors at construction instead of propagating.
    pub fail_silently: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            capacity: 100,
            early_flush_level: Level::Critical,
            flush_interval: Some(Duration::from_secs(5)),
            fail_silently: false,
        }
    }
}

struct BufferState {
    documents: Vec<Document>,
    /// Most recently emitted record, kept for diagnostic context when a
    /// flush fails.
    last_record: Option<LogRecord>,
}

struct Inner {
    store: Option<Arc<dyn DocumentStore>>,
    formatter: DocumentFormatter,
    config: BufferConfig,
    state: Mutex<BufferState>,
    closed: AtomicBool,
}

struct FlushTimer {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Batching writer: accumulates formatted documents and drains them to the
/// store in bulk.
///
/// A flush is triggered when the buffer reaches capacity, when a record at
/// or above the early-flush severity is emitted, when the periodic timer
/// fires, or on [`destroy`](Self::destroy). Delivery is at-most-once:
/// documents a flush fails to write are dropped, never retried.
///
/// Construction spawns the timer task and therefore must happen inside a
/// Tokio runtime when a flush interval is configured. Dropping the handler
/// without calling `destroy` stops the timer but loses any buffered
/// residue.
pub struct BufferedHandler {
    inner: Arc<Inner>,
    timer: Mutex<Option<FlushTimer>>,
}

impl BufferedHandler {
    pub fn new(store: Arc<dyn DocumentStore>, config: BufferConfig) -> Self {
        Self::build(Some(store), config)
    }

    /// A handler with no bound store. Appends accumulate but every flush
    /// is a no-op.
    pub fn disconnected(config: BufferConfig) -> Self {
        Self::build(None, config)
    }

    /// Apply the connection-failure policy to a connect attempt, as
    /// configured by `config.fail_silently`.
    pub fn from_connect_result(
        result: Result<Arc<dyn DocumentStore>, StoreError>,
        config: BufferConfig,
    ) -> Result<Self, StoreError> {
        match result {
            Ok(store) => Ok(BufferedHandler::new(store, config)),
            Err(_) if config.fail_silently => Ok(BufferedHandler::disconnected(config)),
            Err(e) => Err(e),
        }
    }

    fn build(store: Option<Arc<dyn DocumentStore>>, mut config: BufferConfig) -> Self {
        // Guard against degenerate configs.
        config.capacity = config.capacity.max(1);

        let inner = Arc::new(Inner {
            store,
            formatter: DocumentFormatter,
            config,
            state: Mutex::new(BufferState {
                documents: Vec::new(),
                last_record: None,
            }),
            closed: AtomicBool::new(false),
        });

        let timer = match inner.config.flush_interval {
            Some(period) if !period.is_zero() => Some(spawn_flush_timer(Arc::clone(&inner), period)),
            _ => None,
        };

        BufferedHandler {
            inner,
            timer: Mutex::new(timer),
        }
    }

    /// Append `record`'s document to the buffer and flush if a trigger
    /// fires.
    ///
    /// The append and the trigger evaluation happen under the buffer lock;
    /// the flush itself re-acquires it, so a redundant flush racing in
    /// from another task simply finds the buffer already drained.
    pub async fn emit(&self, record: &LogRecord) {
        let should_flush = {
            let mut state = self.inner.state.lock().await;
            state.last_record = Some(record.clone());
            state.documents.push(self.inner.formatter.format(record));
            state.documents.len() >= self.inner.config.capacity
                || record.level >= self.inner.config.early_flush_level
        };
        if should_flush {
            self.inner.flush().await;
        }
    }

    /// Drain the buffer to the store. Safe to call at any time, from any
    /// task; an empty or unbound buffer makes it a no-op.
    pub async fn flush(&self) {
        self.inner.flush().await;
    }

    /// Number of documents currently awaiting a flush.
    pub async fn pending(&self) -> usize {
        self.inner.state.lock().await.documents.len()
    }

    /// Stop the periodic timer, flush any residual documents, and close
    /// the store. Idempotent: a second call finds nothing left to do.
    pub async fn destroy(&self) {
        if let Some(timer) = self.timer.lock().await.take() {
            let _ = timer.stop.send(true);
            let _ = timer.handle.await;
        }
        self.inner.flush().await;
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(store) = &self.inner.store {
            if let Err(e) = store.close().await {
                eprintln!("store close failed: {}", e);
            }
        }
    }
}

impl Inner {
    /// Drain-and-write, holding the buffer lock for the whole operation so
    /// two flushes can never drain the same documents.
    async fn flush(&self) {
        let mut state = self.state.lock().await;
        let Some(store) = &self.store else {
            return;
        };
        if state.documents.is_empty() {
            return;
        }

        // The buffer is replaced up front: whatever the write attempts
        // below leave behind is dropped, not retried.
        let documents = std::mem::take(&mut state.documents);

        if let Err(bulk_err) = store.insert_many(&documents).await {
            let last_logger = state
                .last_record
                .as_ref()
                .map(|record| record.logger.clone())
                .unwrap_or_default();
            for document in &documents {
                if let Err(item_err) = store.insert_one(document).await {
                    if suppress_report(document) {
                        continue;
                    }
                    eprintln!(
                        "buffer flush failed (last logger: {}): {}; {}; document: {}",
                        last_logger,
                        bulk_err,
                        item_err,
                        serde_json::to_string(document)
                            .unwrap_or_else(|_| "<unserializable>".to_string()),
                    );
                }
            }
        }
    }
}

/// DEBUG documents fail quietly: the write is still attempted and still
/// dropped, but no diagnostic line is produced.
fn suppress_report(document: &Document) -> bool {
    document_level(document) == Some(Level::Debug.as_str())
}

fn spawn_flush_timer(inner: Arc<Inner>, period: Duration) -> FlushTimer {
    let (stop, mut stopped) = watch::channel(false);
    let handle = tokio::spawn(async move {
        loop {
            // The first flush happens one full period after construction.
            // `changed` also completes when the handler is dropped and the
            // sender goes away, so the task never outlives its handler.
            tokio::select! {
                _ = sleep(period) => inner.flush().await,
                _ = stopped.changed() => break,
            }
        }
    });
    FlushTimer { stop, handle }
}
