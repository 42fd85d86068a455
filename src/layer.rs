use crate::buffered::BufferedHandler;
use crate::record::{Level, LogRecord, RecordError};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// forwards them to a [`BufferedHandler`] via a bounded channel and a
/// background task.
///
/// The instrumented thread only pays for field capture and a `try_send`;
/// when the channel is full the record is dropped and counted rather than
/// blocking the caller. Store I/O happens entirely on the background task.
pub struct DocStoreLayer {
    sender: mpsc::Sender<LogRecord>,
    min_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into the channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
}

impl DocStoreLayer {
    /// Create a layer and spawn the background task that feeds `handler`.
    ///
    /// **Parameters**
    /// - `handler`: the buffered handler that owns batching and flushing.
    /// - `min_level`: events below this severity are ignored.
    /// - `channel_buffer`: bounded queue length between the instrumented
    ///   threads and the background task (minimum 16 enforced).
    ///
    /// The returned [`JoinHandle`] completes after the layer is dropped
    /// and the channel has been drained; the task performs one final
    /// residual flush on its way out.
    pub fn new(
        handler: Arc<BufferedHandler>,
        min_level: Level,
        channel_buffer: usize,
    ) -> (Self, JoinHandle<()>) {
        let channel_buffer = channel_buffer.max(16);
        let (tx, mut rx) = mpsc::channel::<LogRecord>(channel_buffer);

        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                handler.emit(&record).await;
            }
            // Channel closed: the layer is gone, push out what's left.
            handler.flush().await;
        });

        (
            DocStoreLayer {
                sender: tx,
                min_level,
                total_events: Arc::new(AtomicU64::new(0)),
                enqueued_events: Arc::new(AtomicU64::new(0)),
                dropped_events: Arc::new(AtomicU64::new(0)),
            },
            handle,
        )
    }
}

impl<S> Layer<S> for DocStoreLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let level = Level::from(event.metadata().level());
        if level < self.min_level {
            return;
        }

        let mut extras = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut error: Option<RecordError> = None;

        let mut visitor = FieldVisitor {
            extras: &mut extras,
            message: &mut message,
            error: &mut error,
        };
        event.record(&mut visitor);

        let meta = event.metadata();
        let current = std::thread::current();
        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            logger: meta.target().to_string(),
            message: message.unwrap_or_default(),
            module_path: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
            // tracing metadata carries no function name.
            method: None,
            thread_id: format!("{:?}", current.id()),
            thread_name: current.name().map(str::to_string),
            error,
            extras,
        };

        match self.sender.try_send(record) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log channel full, dropping log record");
            }
        }
    }
}

use tracing::field::{Field, Visit};

struct FieldVisitor<'a> {
    extras: &'a mut BTreeMap<String, serde_json::Value>,
    message: &'a mut Option<String>,
    error: &'a mut Option<RecordError>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.extras.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.extras
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.extras
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.extras
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.extras
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn std::error::Error + 'static)) {
        *self.error = Some(RecordError::from_error(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.extras.insert(
                field.name().to_string(),
                serde_json::Value::String(format!("{:?}", value)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffered::BufferConfig;
    use crate::testutil::RecordingStore;
    use serde_json::json;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    fn handler_with(store: Arc<RecordingStore>) -> Arc<BufferedHandler> {
        Arc::new(BufferedHandler::new(
            store,
            BufferConfig {
                capacity: 100,
                flush_interval: None,
                ..BufferConfig::default()
            },
        ))
    }

    #[tokio::test]
    async fn events_flow_end_to_end_into_the_store() {
        let store = Arc::new(RecordingStore::default());
        let handler = handler_with(store.clone());
        let (layer, handle) = DocStoreLayer::new(Arc::clone(&handler), Level::Info, 64);

        {
            let subscriber = Registry::default().with(layer);
            let _guard = tracing::subscriber::set_default(subscriber);
            tracing::warn!(request_id = "r-9", attempt = 2u64, "upstream wobbled");
        }
        // Subscriber (and with it the sender) is gone; wait for the drain.
        handle.await.expect("forwarder task");

        let stored = store.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["level"], json!("WARNING"));
        assert_eq!(stored[0]["message"], json!("upstream wobbled"));
        assert_eq!(stored[0]["request_id"], json!("r-9"));
        assert_eq!(stored[0]["attempt"], json!(2));
    }

    #[tokio::test]
    async fn events_below_min_level_are_ignored() {
        let store = Arc::new(RecordingStore::default());
        let handler = handler_with(store.clone());
        let (layer, handle) = DocStoreLayer::new(Arc::clone(&handler), Level::Error, 64);
        let total = Arc::clone(&layer.total_events);
        let enqueued = Arc::clone(&layer.enqueued_events);

        {
            let subscriber = Registry::default().with(layer);
            let _guard = tracing::subscriber::set_default(subscriber);
            tracing::info!("not severe enough");
            tracing::error!("this one counts");
        }
        handle.await.expect("forwarder task");

        assert_eq!(total.load(Ordering::Relaxed), 2);
        assert_eq!(enqueued.load(Ordering::Relaxed), 1);
        assert_eq!(store.stored().len(), 1);
    }
}
