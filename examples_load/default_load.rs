use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use tracing_logfmter::init::init_tracing;
use tracing_logfmter::noop_sink::NoopSink;

#[tokio::main]
async fn main() {
    let sink = Arc::new(NoopSink);
    if let Err(e) = init_tracing(sink) {
        eprintln!("failed to initialize tracing: {}", e);
        return;
    }

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, user = "load tester", "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: encoded {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sleep(Duration::from_secs(2)).await;
}
