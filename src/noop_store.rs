use crate::formatter::Document;
use crate::store::{DocumentStore, StoreError};
use async_trait::async_trait;

/// A store that simply drops all documents.
///
/// Useful for measuring the overhead of the handlers themselves without
/// any external I/O, and for unit tests that don't care about persistence.
#[derive(Clone, Default)]
pub struct NoopStore;

#[async_trait]
impl DocumentStore for NoopStore {
    async fn insert_one(&self, _document: &Document) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_many(&self, _documents: &[Document]) -> Result<(), StoreError> {
        Ok(())
    }
}
