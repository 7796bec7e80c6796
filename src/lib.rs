//! Encode structured log events as single logfmt lines.
//!
//! [`Logfmter`] turns a [`LogEvent`] into one `key=value` line. The
//! [`layer`] module plugs it into `tracing` and ships lines to a
//! [`LineSink`].

pub mod key;
pub mod value;
pub mod exception;
pub mod event;
pub mod fields;
pub mod encoder;

pub mod sink;
pub mod layer;
pub mod init;
pub mod env;
pub mod noop_sink;

#[cfg(feature = "stdout")]
pub mod stdout_sink;

pub use encoder::{ConfigError, EncoderConfig, Logfmter};
pub use event::{Fields, LogEvent, Message};
pub use exception::ExceptionInfo;
pub use sink::LineSink;
pub use value::{Value, ValueFormatter};
