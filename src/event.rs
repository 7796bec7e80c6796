use std::collections::BTreeMap;

use crate::exception::ExceptionInfo;
use crate::value::Value;

/// Ordered name → value mapping that keeps first-insertion order.
///
/// Inserting an existing name replaces its value in place.
#[derive(Debug, Clone, Default)]
pub struct Fields {
    entries: Vec<(String, Value)>,
}

impl Fields {
    pub fn new() -> Self {
        Fields::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// The message of a log call: free text or a structured mapping.
#[derive(Debug, Clone)]
pub enum Message {
    Text(String),
    Fields(Fields),
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Text(value.to_string())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Text(value)
    }
}

impl From<Fields> for Message {
    fn from(value: Fields) -> Self {
        Message::Fields(value)
    }
}

/// Everything a single log call hands to the encoder.
///
/// `attributes` are the context values supplied by the logging framework
/// (`levelname`, `asctime`, ...). They are only emitted when requested
/// through the encoder's keys. `extra` and a structured `message` are
/// always emitted.
#[derive(Debug, Clone, Default)]
pub struct LogEvent {
    pub attributes: BTreeMap<String, Value>,
    pub extra: Fields,
    pub message: Option<Message>,
    pub exception: Option<ExceptionInfo>,
}

impl LogEvent {
    pub fn new() -> Self {
        LogEvent::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name, value);
        self
    }

    pub fn with_message(mut self, message: impl Into<Message>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }
}
