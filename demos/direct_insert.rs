use std::sync::Arc;

use tracing_mongo_sink::handler::DirectHandler;
use tracing_mongo_sink::mongo::{MongoConfig, MongoStore};
use tracing_mongo_sink::record::{Level, LogRecord, RecordError};
use tracing_mongo_sink::store::DocumentStore;

/// Writes two documents straight into MongoDB, no buffering. Configure the
/// target with the LOG_SINK_MONGO_* environment variables.
#[tokio::main]
async fn main() {
    let config = MongoConfig::from_env();
    let connected = MongoStore::connect(&config)
        .await
        .map(|store| Arc::new(store) as Arc<dyn DocumentStore>);

    // Silent policy: with no MongoDB around, the handler degrades to a no-op.
    let handler = DirectHandler::from_connect_result(connected, true)
        .expect("silent policy never propagates");

    handler
        .emit(&LogRecord::new(Level::Info, "demo", "direct insert works"))
        .await;
    handler
        .emit(
            &LogRecord::new(Level::Error, "demo", "and errors carry exceptions").with_error(
                RecordError::new("exc1", "demo stack trace"),
            ),
        )
        .await;

    handler.close().await;
    println!("done; check the {} collection", config.collection);
}
