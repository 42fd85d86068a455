use crate::formatter::DocumentFormatter;
use crate::record::LogRecord;
use crate::store::{DocumentStore, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unbuffered writer: formats each record and inserts it immediately.
///
/// Write failures never reach the caller. When `fail_silently` is set they
/// are swallowed entirely; otherwise they are reported on stderr. A handler
/// built without a store (connection failure under the silent policy)
/// accepts records and drops them.
pub struct DirectHandler {
    store: Option<Arc<dyn DocumentStore>>,
    formatter: DocumentFormatter,
    fail_silently: bool,
    closed: AtomicBool,
}

impl DirectHandler {
    pub fn new(store: Arc<dyn DocumentStore>, fail_silently: bool) -> Self {
        DirectHandler {
            store: Some(store),
            formatter: DocumentFormatter,
            fail_silently,
            closed: AtomicBool::new(false),
        }
    }

    /// A handler with no bound store; every emission is a no-op.
    pub fn disconnected(fail_silently: bool) -> Self {
        DirectHandler {
            store: None,
            formatter: DocumentFormatter,
            fail_silently,
            closed: AtomicBool::new(false),
        }
    }

    /// Apply the connection-failure policy to a connect attempt.
    ///
    /// **Returns**
    /// - `Ok(connected handler)` when the connect succeeded.
    /// - `Ok(disconnected handler)` when it failed and `fail_silently` is
    ///   set.
    /// - `Err(..)` when it failed and the policy demands propagation.
    pub fn from_connect_result(
        result: Result<Arc<dyn DocumentStore>, StoreError>,
        fail_silently: bool,
    ) -> Result<Self, StoreError> {
        match result {
            Ok(store) => Ok(DirectHandler::new(store, fail_silently)),
            Err(_) if fail_silently => Ok(DirectHandler::disconnected(true)),
            Err(e) => Err(e),
        }
    }

    /// Format `record` and insert the resulting document.
    pub async fn emit(&self, record: &LogRecord) {
        let Some(store) = &self.store else {
            return;
        };
        let document = self.formatter.format(record);
        if let Err(e) = store.insert_one(&document).await {
            if !self.fail_silently {
                eprintln!(
                    "log insert failed for logger {}: {}",
                    record.logger, e
                );
            }
        }
    }

    /// Release the underlying store. Idempotent; a never-connected handler
    /// closes without complaint.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(store) = &self.store {
            if let Err(e) = store.close().await {
                eprintln!("store close failed: {}", e);
            }
        }
    }
}
