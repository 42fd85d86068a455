use crate::formatter::Document;
use async_trait::async_trait;

/// Errors surfaced by [`DocumentStore`] implementations.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or validated at construction.
    #[error("cannot reach the document store: {0}")]
    Connectivity(String),

    /// A write was rejected by the backend.
    #[error("write rejected by the document store: {0}")]
    Write(String),

    /// A document could not be converted into the backend's native form.
    #[error("document serialization failed: {0}")]
    Serialization(String),
}

/// Asynchronous destination for formatted log [`Document`]s.
///
/// Implementations transport documents to a concrete backend (MongoDB,
/// an in-memory recorder, stdout, etc). Handlers call these methods from
/// the emitting task or from the background flush task and treat every
/// error as best-effort: a failed write is reported, never raised back
/// into application code.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a single document.
    async fn insert_one(&self, document: &Document) -> Result<(), StoreError>;

    /// Persist a batch of documents in one operation.
    ///
    /// Any error means the whole batch must be treated as failed; the
    /// flush engine then falls back to [`insert_one`](Self::insert_one)
    /// per document.
    async fn insert_many(&self, documents: &[Document]) -> Result<(), StoreError>;

    /// Release the underlying connection, if any.
    ///
    /// Default implementation is a no-op.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
