use crate::sink::LineSink;
use async_trait::async_trait;
use std::error::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Writes each line to standard output followed by `\n`.
///
/// Lines are written under a lock so concurrent senders never interleave
/// within a line.
#[derive(Default)]
pub struct StdoutSink {
    out: Mutex<Option<tokio::io::Stdout>>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LineSink for StdoutSink {
    async fn send(&self, line: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut guard = self.out.lock().await;
        let out = guard.get_or_insert_with(tokio::io::stdout);
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        out.write_all(&buf).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(out) = self.out.lock().await.as_mut() {
            out.flush().await?;
        }
        Ok(())
    }
}
