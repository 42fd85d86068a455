use async_trait::async_trait;
use std::sync::Arc;

use tracing_mongo_sink::buffered::{BufferConfig, BufferedHandler};
use tracing_mongo_sink::formatter::Document;
use tracing_mongo_sink::record::{Level, LogRecord};
use tracing_mongo_sink::store::{DocumentStore, StoreError};

/// A store that prints every batch to stdout, to show what implementing
/// [`DocumentStore`] for a custom backend looks like.
struct StdoutStore;

#[async_trait]
impl DocumentStore for StdoutStore {
    async fn insert_one(&self, document: &Document) -> Result<(), StoreError> {
        println!(
            "single: {}",
            serde_json::to_string(document).unwrap_or_default()
        );
        Ok(())
    }

    async fn insert_many(&self, documents: &[Document]) -> Result<(), StoreError> {
        println!("batch of {}:", documents.len());
        for document in documents {
            println!("  {}", serde_json::to_string(document).unwrap_or_default());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let config = BufferConfig {
        capacity: 4,
        early_flush_level: Level::Critical,
        flush_interval: None,
        fail_silently: false,
    };
    let handler = BufferedHandler::new(Arc::new(StdoutStore), config);

    for i in 0..10 {
        handler
            .emit(&LogRecord::new(Level::Info, "demo", format!("event {}", i)))
            .await;
    }
    // A critical record flushes the partial batch immediately.
    handler
        .emit(&LogRecord::new(Level::Critical, "demo", "flush now"))
        .await;

    handler.destroy().await;
}
