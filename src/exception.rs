use std::error::Error;

use crate::value::format_string;

/// Exception context attached to a log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    /// Exception type name, e.g. `ParseIntError`. May be empty.
    pub kind: String,
    pub message: String,
    /// Already-expanded, possibly multi-line trace.
    pub trace: Option<String>,
}

impl ExceptionInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ExceptionInfo {
            kind: kind.into(),
            message: message.into(),
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Capture a typed error. The kind is the error's short type name and
    /// the trace is its `source()` chain.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: Error + 'static,
    {
        let full = std::any::type_name::<E>();
        let path = full.split('<').next().unwrap_or(full);
        let kind = path.rsplit("::").next().unwrap_or(path);
        Self::from_dyn_error(kind, err)
    }

    /// Capture a type-erased error under an explicit kind.
    pub fn from_dyn_error(kind: &str, err: &(dyn Error + 'static)) -> Self {
        let mut info = ExceptionInfo::new(kind, err.to_string());
        let causes: Vec<String> = std::iter::successors(err.source(), |&e| e.source())
            .map(|cause| format!("caused by: {}", cause))
            .collect();
        if !causes.is_empty() {
            info.trace = Some(causes.join("\n"));
        }
        info
    }

    /// The unflattened text block: `kind: message`, then the trace.
    pub fn text(&self) -> String {
        let mut text = if self.kind.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.kind, self.message)
        };
        if let Some(trace) = &self.trace {
            let trace = trace.trim_end_matches(&['\n', '\r'][..]);
            if !trace.is_empty() {
                text.push('\n');
                text.push_str(trace);
            }
        }
        text
    }

    /// Render as a single logfmt token.
    pub fn render(&self) -> String {
        format_string(&self.text())
    }
}
