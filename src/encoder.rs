use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::event::LogEvent;
use crate::fields::{self, FieldSet, EXC_INFO_KEY, MSG_KEY};
use crate::key::normalize_key;
use crate::value::{Value, ValueFormatter, ValueRenderer, DEFAULT_DATEFMT};

/// Construction-time options of a [`Logfmter`].
///
/// **Fields**
/// - `keys`: output keys emitted first on every line, in this order.
/// - `mapping`: output key → context attribute it is read from. Keys
///   without an entry read the attribute of the same name.
/// - `datefmt`: strftime format for timestamp values. `None` uses
///   [`DEFAULT_DATEFMT`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub keys: Vec<String>,
    pub mapping: BTreeMap<String, String>,
    pub datefmt: Option<String>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            keys: vec!["at".to_string()],
            mapping: BTreeMap::from([("at".to_string(), "levelname".to_string())]),
            datefmt: None,
        }
    }
}

/// Error returned when an [`EncoderConfig`] is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid date format: {0:?}")]
    InvalidDateFormat(String),

    #[error("mapping for key {0:?} names an empty attribute")]
    EmptyAttribute(String),

    #[error("requested key {0:?} appears more than once after normalization")]
    DuplicateKey(String),

    #[error("requested key {0:?} is reserved")]
    ReservedKey(String),
}

/// Encodes [`LogEvent`]s into single logfmt lines.
///
/// The encoder holds only read-only configuration, so one instance can
/// be shared across threads and reused for every event.
#[derive(Clone, Debug)]
pub struct Logfmter {
    keys: Vec<String>,
    mapping: BTreeMap<String, String>,
    renderer: ValueRenderer,
}

impl Logfmter {
    /// Validate `config` and build an encoder.
    ///
    /// Keys are normalized here, once, so that an invalid configuration
    /// fails before the first event rather than in the middle of a stream.
    pub fn new(config: EncoderConfig) -> Result<Self, ConfigError> {
        let datefmt = config.datefmt.unwrap_or_else(|| DEFAULT_DATEFMT.to_string());
        if StrftimeItems::new(&datefmt).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidDateFormat(datefmt));
        }

        let mut mapping = BTreeMap::new();
        for (key, attribute) in config.mapping {
            if attribute.is_empty() {
                return Err(ConfigError::EmptyAttribute(key));
            }
            mapping.insert(normalize_key(&key), attribute);
        }

        let mut keys: Vec<String> = Vec::with_capacity(config.keys.len());
        for key in &config.keys {
            let key = normalize_key(key);
            if key == MSG_KEY || key == EXC_INFO_KEY {
                return Err(ConfigError::ReservedKey(key));
            }
            if keys.contains(&key) {
                return Err(ConfigError::DuplicateKey(key));
            }
            keys.push(key);
        }

        tracing::debug!(keys = ?keys, datefmt = %datefmt, "logfmt encoder configured");

        Ok(Self {
            keys,
            mapping,
            renderer: ValueRenderer::new(datefmt),
        })
    }

    /// Register a value formatter that is consulted before the built-in
    /// rendering rules. Formatters run in registration order.
    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: ValueFormatter + 'static,
    {
        self.renderer.push(Arc::new(formatter));
        self
    }

    /// Normalized requested keys, in output order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Context attribute an output key is read from.
    pub fn attribute_for<'a>(&'a self, key: &'a str) -> &'a str {
        self.mapping.get(key).map_or(key, String::as_str)
    }

    /// Whether any requested key resolves to `attribute`.
    pub fn requests(&self, attribute: &str) -> bool {
        self.keys.iter().any(|key| self.attribute_for(key) == attribute)
    }

    pub fn format_value(&self, value: &Value) -> String {
        self.renderer.render(value)
    }

    /// Build the ordered field set for `event` without joining it.
    pub fn fields(&self, event: &LogEvent) -> FieldSet {
        fields::collect(&self.keys, &self.mapping, &self.renderer, event)
    }

    /// Encode `event` into one line without a trailing terminator.
    pub fn encode(&self, event: &LogEvent) -> String {
        self.fields(event).render()
    }
}

impl Default for Logfmter {
    fn default() -> Self {
        Self {
            keys: vec!["at".to_string()],
            mapping: BTreeMap::from([("at".to_string(), "levelname".to_string())]),
            renderer: ValueRenderer::default(),
        }
    }
}
