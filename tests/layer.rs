use async_trait::async_trait;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use tracing_logfmter::init::{build_layer, LayerConfig};
use tracing_logfmter::layer::{level_number, LogfmtLayer};
use tracing_logfmter::{EncoderConfig, LineSink, Logfmter};

#[derive(Default)]
struct MemorySink {
    lines: Mutex<Vec<String>>,
    failures_left: AtomicUsize,
}

impl MemorySink {
    fn failing(times: usize) -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(times),
        }
    }

    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl LineSink for MemorySink {
    async fn send(&self, line: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err("sink unavailable".into());
        }
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

fn layer_with(sink: Arc<MemorySink>, max_level: Level) -> (LogfmtLayer, tokio::task::JoinHandle<()>) {
    LogfmtLayer::new(
        Logfmter::default(),
        sink,
        max_level,
        64,
        1,
        Duration::from_millis(10),
    )
}

#[tokio::test]
async fn encodes_events_and_filters_by_level() {
    let sink = Arc::new(MemorySink::default());
    let (layer, handle) = layer_with(sink.clone(), Level::INFO);
    let total = layer.total_events.clone();
    let enqueued = layer.enqueued_events.clone();

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::error!(alpha = 1, "hello");
        tracing::debug!("too verbose");
        tracing::info!(user = "ann lee", ok = true, ratio = 0.5, "signed in");
    });
    handle.await.unwrap();

    assert_eq!(
        sink.lines(),
        [
            "at=ERROR msg=hello alpha=1",
            "at=INFO msg=\"signed in\" user=\"ann lee\" ok=true ratio=0.5",
        ]
    );
    assert_eq!(total.load(Ordering::Relaxed), 3);
    assert_eq!(enqueued.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn errors_become_exception_context() {
    let sink = Arc::new(MemorySink::default());
    let (layer, handle) = layer_with(sink.clone(), Level::ERROR);

    let err = std::io::Error::other("disk gone\nfor good");
    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::error!(error = &err as &(dyn Error + 'static), path = "/tmp/x", "write failed");
    });
    handle.await.unwrap();

    assert_eq!(
        sink.lines(),
        ["at=ERROR msg=\"write failed\" exc_info=\"error: disk gone\\nfor good\" path=/tmp/x"]
    );
}

#[tokio::test]
async fn requested_context_keys_come_from_metadata() {
    let sink = Arc::new(MemorySink::default());
    let config = LayerConfig {
        encoder: EncoderConfig {
            keys: vec!["at".into(), "no".into(), "logger".into(), "when".into()],
            mapping: [
                ("at", "levelname"),
                ("no", "levelno"),
                ("logger", "name"),
                ("when", "asctime"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            datefmt: Some("%Y".to_string()),
        },
        batch_size: 1,
        flush_interval: Duration::from_millis(10),
        ..LayerConfig::default()
    };
    let (layer, handle) = build_layer(sink.clone(), config).unwrap();

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::warn!(target: "billing", "late");
    });
    handle.await.unwrap();

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    let year = chrono::Utc::now().format("%Y").to_string();
    assert_eq!(
        lines[0],
        format!("at=WARN no={} logger=billing when={} msg=late", level_number(&Level::WARN), year)
    );
}

#[tokio::test]
async fn invalid_layer_config_is_rejected() {
    let config = LayerConfig {
        encoder: EncoderConfig {
            datefmt: Some("%Q".to_string()),
            ..EncoderConfig::default()
        },
        ..LayerConfig::default()
    };
    assert!(build_layer(Arc::new(MemorySink::default()), config).is_err());
}

#[tokio::test]
async fn failed_sends_are_retried() {
    let sink = Arc::new(MemorySink::failing(1));
    let (layer, handle) = layer_with(sink.clone(), Level::INFO);

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::info!("first");
        tracing::info!("second");
    });
    handle.await.unwrap();

    assert_eq!(sink.lines(), ["at=INFO msg=first", "at=INFO msg=second"]);
}
