use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for encoded logfmt lines.
///
/// Implementations are responsible for transporting lines to a concrete
/// output (stdout, a file, a socket, etc). The layer calls `send` from a
/// background task and never awaits it on the application thread.
#[async_trait]
pub trait LineSink: Send + Sync {
    /// Write a single encoded line.
    ///
    /// **Parameters**
    /// - `line`: one logfmt line without a terminator. Appending the
    ///   line terminator is the sink's job.
    ///
    /// **Returns**
    /// - `Ok(())` if the line was accepted by the output.
    /// - `Err(..)` if the output failed. The layer treats this as a
    ///   transient failure and retries the batch with backoff.
    async fn send(&self, line: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered lines, if the sink buffers.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
