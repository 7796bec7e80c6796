use chrono::{DateTime, Utc};
use std::fmt::{self, Write};
use std::sync::Arc;

/// Token emitted when a value's own textual conversion fails.
pub const PLACEHOLDER: &str = "<unprintable>";

/// Default strftime format for [`Value::Timestamp`] values.
pub const DEFAULT_DATEFMT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// A raw field value as supplied by the caller, before rendering.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// Rendered through the encoder's date format.
    Timestamp(DateTime<Utc>),
    /// Anything else; rendered through its `Display` implementation.
    Display(Arc<dyn fmt::Display + Send + Sync>),
}

impl Value {
    /// Wrap an arbitrary displayable value.
    pub fn display<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Value::Display(Arc::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::UInt(u) => f.debug_tuple("UInt").field(u).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Timestamp(ts) => f.debug_tuple("Timestamp").field(ts).finish(),
            Value::Display(_) => f.write_str("Display(..)"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::$variant(value as $target)
                }
            }
        )*
    };
}

impl_from_int!(Int, i64: i8, i16, i32, i64, isize);
impl_from_int!(UInt, u64: u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    n.as_f64().map_or(Value::Null, Value::Float)
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            other => Value::Str(other.to_string()),
        }
    }
}

/// Strategy that may take over rendering for some values.
///
/// Returning `Some(text)` claims the value; `text` is still quoted and
/// escaped by [`format_string`]. Returning `None` falls through to the
/// next formatter and finally to the built-in rules.
pub trait ValueFormatter: Send + Sync {
    fn format(&self, value: &Value) -> Option<String>;
}

impl<F> ValueFormatter for F
where
    F: Fn(&Value) -> Option<String> + Send + Sync,
{
    fn format(&self, value: &Value) -> Option<String> {
        self(value)
    }
}

/// Quote and escape `value` so that it is a single logfmt token.
///
/// Values without whitespace, `=`, quotes or backslashes are emitted
/// bare. Everything else is wrapped in double quotes with `\\`, `\"`,
/// `\n`, `\r` and `\t` escaped. The empty string renders as `""`.
pub fn format_string(value: &str) -> String {
    if value.is_empty() {
        return "\"\"".to_string();
    }

    let needs_quoting = value
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '=' | '"' | '\\'));
    if !needs_quoting {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Renders [`Value`]s into logfmt tokens.
///
/// Registered formatters are consulted in order before the built-in
/// type dispatch. Rendering never fails.
#[derive(Clone)]
pub struct ValueRenderer {
    formatters: Vec<Arc<dyn ValueFormatter>>,
    datefmt: String,
}

impl ValueRenderer {
    pub fn new(datefmt: impl Into<String>) -> Self {
        ValueRenderer {
            formatters: Vec::new(),
            datefmt: datefmt.into(),
        }
    }

    /// Append a formatter; earlier registrations take precedence.
    pub fn push(&mut self, formatter: Arc<dyn ValueFormatter>) {
        self.formatters.push(formatter);
    }

    pub fn datefmt(&self) -> &str {
        &self.datefmt
    }

    pub fn render(&self, value: &Value) -> String {
        for formatter in &self.formatters {
            if let Some(text) = formatter.format(value) {
                return format_string(&text);
            }
        }
        self.render_builtin(value)
    }

    fn render_builtin(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => "false".to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Str(s) => format_string(s),
            Value::Timestamp(ts) => display_token(&ts.format(&self.datefmt)),
            Value::Display(d) => display_token(d),
        }
    }
}

impl Default for ValueRenderer {
    fn default() -> Self {
        ValueRenderer::new(DEFAULT_DATEFMT)
    }
}

impl fmt::Debug for ValueRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRenderer")
            .field("formatters", &self.formatters.len())
            .field("datefmt", &self.datefmt)
            .finish()
    }
}

fn display_token(value: &dyn fmt::Display) -> String {
    let mut buf = String::new();
    match write!(buf, "{}", value) {
        Ok(()) => format_string(&buf),
        Err(_) => PLACEHOLDER.to_string(),
    }
}
