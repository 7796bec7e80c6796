use crate::encoder::Logfmter;
use crate::event::{Fields, LogEvent, Message};
use crate::exception::ExceptionInfo;
use crate::sink::LineSink;
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Send attempts per batch before the batch is dropped.
const MAX_SEND_ATTEMPTS: u32 = 5;

/// `tracing_subscriber` layer that encodes events as logfmt lines and
/// forwards them to an asynchronous [`LineSink`] via a bounded channel
/// and background task.
///
/// Encoding happens on the calling thread; output I/O is fully decoupled
/// from application threads.
pub struct LogfmtLayer {
    encoder: Arc<Logfmter>,
    max_level: Level,
    sender: mpsc::Sender<String>,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
}

impl LogfmtLayer {
    /// Create a new layer and spawn a background task that pulls lines
    /// from a bounded channel and sends them to the provided [`LineSink`].
    ///
    /// Must be called within a Tokio runtime. Minimal thresholds are
    /// enforced for `buffer`, `batch_size` and `flush_interval` to avoid
    /// degenerate configurations.
    pub fn new(
        encoder: Logfmter,
        sink: Arc<dyn LineSink>,
        max_level: Level,
        buffer: usize,
        batch_size: usize,
        flush_interval: Duration,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<String>(buffer);

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);
            let backoff = Duration::from_millis(100);
            let max_backoff = Duration::from_secs(10);

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(line) => {
                            batch.push(line);
                            if batch.len() >= batch_size {
                                if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff).await {
                                    eprintln!("error sending log batch: {}", e);
                                }
                            }
                        }
                        None => {
                            if !batch.is_empty() {
                                if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff).await {
                                    eprintln!("error flushing log batch: {}", e);
                                }
                            }
                            if let Err(e) = sink.flush().await {
                                eprintln!("error flushing log sink: {}", e);
                            }
                            break;
                        }
                    },
                    _ = sleep(flush_interval) => {
                        if !batch.is_empty() {
                            if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff).await {
                                eprintln!("error flushing log batch: {}", e);
                            }
                        }
                    }
                }
            }
        });

        (Self {
            encoder: Arc::new(encoder),
            max_level,
            sender: tx,
            total_events,
            enqueued_events,
            dropped_events,
        }, handle)
    }

    pub fn encoder(&self) -> &Logfmter {
        &self.encoder
    }
}

/// Send every line of `batch`, retrying the remainder with exponential
/// backoff. The batch is cleared on success and after the final attempt.
async fn send_batch(
    sink: &dyn LineSink,
    batch: &mut Vec<String>,
    mut backoff: Duration,
    max_backoff: Duration,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut attempt = 1;
    loop {
        let mut sent = 0;
        let mut last_err: Option<Box<dyn Error + Send + Sync>> = None;
        for line in batch.iter() {
            if let Err(e) = sink.send(line).await {
                last_err = Some(e);
                break;
            }
            sent += 1;
        }
        batch.drain(..sent);

        let Some(err) = last_err else {
            return Ok(());
        };
        if attempt >= MAX_SEND_ATTEMPTS {
            batch.clear();
            return Err(err);
        }

        eprintln!("log sink send failed: {}, retrying in {:?}", err, backoff);
        sleep(backoff).await;
        backoff = std::cmp::min(backoff * 2, max_backoff);
        attempt += 1;
    }
}

impl<S> Layer<S> for LogfmtLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.max_level {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let now = Utc::now();
        let mut log_event = LogEvent {
            attributes: Default::default(),
            extra: visitor.extra,
            message: visitor.message.map(Message::Text),
            exception: visitor.exception,
        };
        insert_context(&mut log_event, meta, now);
        if self.encoder.requests("asctime") {
            log_event.attributes.insert("asctime".into(), Value::Timestamp(now));
        }

        let line = self.encoder.encode(&log_event);
        match self.sender.try_send(line) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(_e) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log channel full, dropping log line");
            }
        }
    }
}

/// Numeric severity matching the conventional `levelno` scale.
pub fn level_number(level: &Level) -> u8 {
    if *level == Level::ERROR {
        40
    } else if *level == Level::WARN {
        30
    } else if *level == Level::INFO {
        20
    } else if *level == Level::DEBUG {
        10
    } else {
        5
    }
}

/// Fill the context attributes a requested key may refer to.
fn insert_context(event: &mut LogEvent, meta: &tracing::Metadata<'_>, now: DateTime<Utc>) {
    let attrs = &mut event.attributes;
    attrs.insert("levelname".into(), Value::from(meta.level().as_str()));
    attrs.insert("levelno".into(), Value::from(level_number(meta.level())));
    attrs.insert("name".into(), Value::from(meta.target()));
    attrs.insert(
        "created".into(),
        Value::Float(now.timestamp_micros() as f64 / 1_000_000.0),
    );
    attrs.insert("process".into(), Value::from(std::process::id()));
    if let Some(module) = meta.module_path() {
        attrs.insert("module".into(), Value::from(module));
    }
    if let Some(file) = meta.file() {
        attrs.insert("pathname".into(), Value::from(file));
    }
    if let Some(line) = meta.line() {
        attrs.insert("lineno".into(), Value::from(line));
    }
    if let Some(thread) = std::thread::current().name() {
        attrs.insert("thread".into(), Value::from(thread));
    }
}

/// Splits event fields into message, exception and extra fields.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    exception: Option<ExceptionInfo>,
    extra: Fields,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.extra.insert(field.name(), value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.extra.insert(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.extra.insert(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.extra.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.extra.insert(field.name(), value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if self.exception.is_none() {
            self.exception = Some(ExceptionInfo::from_dyn_error(field.name(), value));
        } else {
            self.extra.insert(field.name(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.extra.insert(field.name(), format!("{:?}", value));
        }
    }
}
