use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use tracing_mongo_sink::init::init_tracing;
use tracing_mongo_sink::noop_store::NoopStore;

#[tokio::main]
async fn main() {
    let store = Arc::new(NoopStore);
    let handler = init_tracing(store);

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!(
        "default config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Drain whatever the channel and buffer still hold.
    handler.destroy().await;
}
