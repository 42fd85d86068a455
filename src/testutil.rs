use crate::formatter::Document;
use crate::store::{DocumentStore, StoreError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory store that records every call, with switchable failure modes.
#[derive(Default)]
pub(crate) struct RecordingStore {
    pub singles: Mutex<Vec<Document>>,
    pub batches: Mutex<Vec<Vec<Document>>>,
    pub fail_bulk: AtomicBool,
    pub fail_single: AtomicBool,
    pub single_attempts: AtomicUsize,
    pub closed: AtomicUsize,
}

impl RecordingStore {
    pub fn failing_bulk() -> Self {
        let store = RecordingStore::default();
        store.fail_bulk.store(true, Ordering::SeqCst);
        store
    }

    /// Documents persisted through either write path, in arrival order.
    pub fn stored(&self) -> Vec<Document> {
        let mut all: Vec<Document> = self
            .batches
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .cloned()
            .collect();
        all.extend(self.singles.lock().unwrap().iter().cloned());
        all
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn insert_one(&self, document: &Document) -> Result<(), StoreError> {
        self.single_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_single.load(Ordering::SeqCst) {
            return Err(StoreError::Write("single insert refused".to_string()));
        }
        self.singles.lock().unwrap().push(document.clone());
        Ok(())
    }

    async fn insert_many(&self, documents: &[Document]) -> Result<(), StoreError> {
        if self.fail_bulk.load(Ordering::SeqCst) {
            return Err(StoreError::Write("bulk insert refused".to_string()));
        }
        self.batches.lock().unwrap().push(documents.to_vec());
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
