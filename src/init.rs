use crate::buffered::{BufferConfig, BufferedHandler};
use crate::layer::DocStoreLayer;
use crate::record::Level;
use crate::store::DocumentStore;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration for the installed logging stack.
///
/// **Fields**
/// - `min_level`: least severe event the layer captures.
/// - `channel_buffer`: queue length between instrumented threads and the
///   forwarding task; further records are dropped while it is full.
/// - `buffer`: [`BufferConfig`] for the handler that owns batching,
///   early-flush severity and the periodic flush timer.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is
///   stacked on top so events also land on the console.
#[derive(Clone, Debug)]
pub struct InitConfig {
    pub min_level: Level,
    pub channel_buffer: usize,
    pub buffer: BufferConfig,
    pub enable_stdout: bool,
}

impl Default for InitConfig {
    fn default() -> Self {
        InitConfig {
            min_level: Level::Info,
            channel_buffer: 1024,
            buffer: BufferConfig::default(),
            enable_stdout: true,
        }
    }
}

/// Install the global `tracing` subscriber: a [`Registry`] with a
/// [`DocStoreLayer`] feeding a [`BufferedHandler`] over `store`, plus an
/// optional console layer.
///
/// Returns the handler so the application can call
/// [`destroy`](BufferedHandler::destroy) on shutdown to drain the buffer
/// and release the store.
pub fn init_tracing_with_config(
    store: Arc<dyn DocumentStore>,
    config: InitConfig,
) -> Arc<BufferedHandler> {
    let handler = Arc::new(BufferedHandler::new(store, config.buffer));
    let (layer, _handle) =
        DocStoreLayer::new(Arc::clone(&handler), config.min_level, config.channel_buffer);

    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    }

    handler
}

/// Install the logging stack with [`InitConfig::default`]. The recommended
/// entrypoint for typical services.
pub fn init_tracing(store: Arc<dyn DocumentStore>) -> Arc<BufferedHandler> {
    init_tracing_with_config(store, InitConfig::default())
}
