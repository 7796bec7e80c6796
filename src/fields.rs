use std::collections::BTreeMap;

use crate::event::{LogEvent, Message};
use crate::key::normalize_key;
use crate::value::{Value, ValueRenderer};

/// Output key of a free-text message.
pub const MSG_KEY: &str = "msg";

/// Output key of attached exception context.
pub const EXC_INFO_KEY: &str = "exc_info";

/// Ordered, de-duplicated `key → rendered token` set for one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    entries: Vec<(String, String)>,
}

impl FieldSet {
    /// Insert or overwrite. An overwritten key keeps its position.
    pub fn insert(&mut self, key: String, token: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = token,
            None => self.entries.push((key, token)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn move_to(&mut self, key: &str, index: usize) {
        if let Some(pos) = self.entries.iter().position(|(k, _)| k == key) {
            let entry = self.entries.remove(pos);
            let index = index.min(self.entries.len());
            self.entries.insert(index, entry);
        }
    }

    /// Join into one `key=value key2=value2` line. Empty tokens render
    /// as a bare `key=`; no terminator is appended.
    pub fn render(&self) -> String {
        let mut line = String::new();
        for (i, (key, token)) in self.entries.iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            line.push_str(key);
            line.push('=');
            line.push_str(token);
        }
        line
    }
}

/// Gather the fields of `event`.
///
/// Requested keys come first, in order, resolved through `mapping` and
/// skipped when the attribute is absent. Then `exc_info`, then extra
/// fields, then structured message fields; later sources overwrite
/// earlier ones in place. A free-text message is written to `msg` last,
/// and `msg` is always moved right behind the requested block. Exception
/// context is never overwritten.
///
/// `keys` and `mapping` keys must already be normalized.
pub fn collect(
    keys: &[String],
    mapping: &BTreeMap<String, String>,
    renderer: &ValueRenderer,
    event: &LogEvent,
) -> FieldSet {
    let mut fields = FieldSet::default();

    for key in keys {
        let attribute = mapping.get(key).unwrap_or(key);
        if let Some(value) = event.attributes.get(attribute) {
            fields.insert(key.clone(), renderer.render(value));
        }
    }
    let head = fields.len();

    let exc_token = event.exception.as_ref().map(|exc| exc.render());
    if let Some(token) = &exc_token {
        fields.insert(EXC_INFO_KEY.to_string(), token.clone());
    }

    for (name, value) in event.extra.iter() {
        fields.insert(normalize_key(name), renderer.render(value));
    }

    match &event.message {
        Some(Message::Fields(message)) => {
            for (name, value) in message.iter() {
                fields.insert(normalize_key(name), renderer.render(value));
            }
        }
        Some(Message::Text(text)) => {
            fields.insert(MSG_KEY.to_string(), renderer.render(&Value::Str(text.clone())));
        }
        None => {}
    }

    if let Some(token) = exc_token {
        fields.insert(EXC_INFO_KEY.to_string(), token);
    }
    fields.move_to(MSG_KEY, head);

    fields
}
