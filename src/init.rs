use crate::encoder::{ConfigError, EncoderConfig, Logfmter};
use crate::layer::LogfmtLayer;
use crate::sink::LineSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Logging layer configuration.
///
/// Controls the line encoder, the size of the internal buffer, the
/// maximum batch size handed to the sink, how often a partial batch is
/// flushed, and the most verbose level that is encoded.
///
/// **Fields**
/// - `encoder`: [`EncoderConfig`] for the logfmt encoder.
/// - `channel_buffer`: maximum number of lines queued before new lines
///   are dropped.
/// - `batch_size`: number of lines handed to the sink at once.
/// - `flush_interval`: maximum interval between flushes even when the
///   batch is not full.
/// - `max_level`: events more verbose than this are ignored.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub encoder: EncoderConfig,
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub max_level: Level,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderConfig::default(),
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            max_level: Level::INFO,
        }
    }
}

/// Error returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("invalid encoder configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to set global subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Build a [`LogfmtLayer`] from a [`LayerConfig`] without installing it.
///
/// Must be called within a Tokio runtime; the returned handle belongs to
/// the background task that feeds the sink.
pub fn build_layer(
    sink: Arc<dyn LineSink>,
    config: LayerConfig,
) -> Result<(LogfmtLayer, JoinHandle<()>), ConfigError> {
    let encoder = Logfmter::new(config.encoder)?;
    Ok(LogfmtLayer::new(
        encoder,
        sink,
        config.max_level,
        config.channel_buffer,
        config.batch_size,
        config.flush_interval,
    ))
}

/// Initialize the global `tracing` subscriber using the provided sink
/// and [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: implementation of [`LineSink`] that will receive encoded
///   logfmt lines.
/// - `config`: [`LayerConfig`] controlling encoding, buffering and
///   batching.
///
/// **Effects**
///
/// This installs a [`Registry`] combined with [`LogfmtLayer`] as the
/// global default subscriber, so all `tracing` events in the process
/// are observed by the layer.
pub fn init_tracing_with_config(
    sink: Arc<dyn LineSink>,
    config: LayerConfig,
) -> Result<JoinHandle<()>, InitError> {
    let (layer, handle) = build_layer(sink, config)?;
    let subscriber = Registry::default().with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!("logfmt subscriber installed");
    Ok(handle)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`]. This is the recommended entrypoint for
/// typical services.
pub fn init_tracing(sink: Arc<dyn LineSink>) -> Result<JoinHandle<()>, InitError> {
    init_tracing_with_config(sink, LayerConfig::default())
}
