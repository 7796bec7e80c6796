use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{error, Level};

use tracing_logfmter::encoder::EncoderConfig;
use tracing_logfmter::init::{init_tracing_with_config, LayerConfig};
use tracing_logfmter::stdout_sink::StdoutSink;

#[tokio::main]
async fn main() {
    let sink = Arc::new(StdoutSink::new());

    let layer_config = LayerConfig {
        encoder: EncoderConfig {
            keys: vec!["at".into(), "when".into(), "logger".into()],
            mapping: [("at", "levelname"), ("when", "asctime"), ("logger", "name")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            datefmt: Some("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()),
        },
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        max_level: Level::ERROR,
    };

    if let Err(e) = init_tracing_with_config(sink, layer_config) {
        eprintln!("failed to initialize tracing: {}", e);
        return;
    }

    let n: u64 = 10_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    eprintln!("custom config: encoded {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sleep(Duration::from_secs(2)).await;
}
