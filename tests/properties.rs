use proptest::prelude::*;
use std::collections::HashSet;

use tracing_logfmter::{EncoderConfig, ExceptionInfo, Fields, LogEvent, Logfmter};

/// Split a logfmt line into pairs, honoring quotes and backslash escapes.
fn parse_line(line: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = line.chars().peekable();
    while chars.peek().is_some() {
        let key: String = chars.by_ref().take_while(|&c| c != '=').collect();
        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => match chars.next() {
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some(other) => value.push(other),
                        None => {}
                    },
                    c => value.push(c),
                }
            }
            chars.next();
        } else {
            value = chars.by_ref().take_while(|&c| c != ' ').collect();
        }
        pairs.push((key, value));
    }
    pairs
}

fn bare_encoder() -> Logfmter {
    Logfmter::new(EncoderConfig {
        keys: Vec::new(),
        mapping: Default::default(),
        datefmt: None,
    })
    .unwrap()
}

fn upsert(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    match pairs.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value.to_string(),
        None => pairs.push((key.to_string(), value.to_string())),
    }
}

fn plain_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}".prop_filter("reserved", |k| k != "msg" && k != "exc_info")
}

proptest! {
    #[test]
    fn lines_never_contain_line_breaks(
        message in any::<String>(),
        extra in proptest::collection::vec((any::<String>(), any::<String>()), 0..6),
        trace in any::<String>(),
    ) {
        let mut event = LogEvent::new()
            .with_attribute("levelname", "ERROR")
            .with_message(message)
            .with_exception(ExceptionInfo::new("Exception", "boom").with_trace(trace));
        for (k, v) in extra {
            event = event.with_extra(k, v);
        }
        let line = Logfmter::default().encode(&event);
        prop_assert!(!line.contains('\n'));
        prop_assert!(!line.contains('\r'));
    }

    #[test]
    fn keys_are_unique_and_msg_follows_requested_keys(
        message in any::<String>(),
        extra in proptest::collection::vec((any::<String>(), 0i64..100), 0..8),
    ) {
        let mut event = LogEvent::new()
            .with_attribute("levelname", "INFO")
            .with_message(message);
        for (k, v) in extra {
            event = event.with_extra(k, v);
        }
        let pairs = parse_line(&Logfmter::default().encode(&event));
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        let unique: HashSet<&str> = keys.iter().copied().collect();
        prop_assert_eq!(unique.len(), keys.len());
        prop_assert_eq!(&keys[..2], &["at", "msg"][..]);
    }

    #[test]
    fn parsing_recovers_ordered_fields(
        message in any::<String>(),
        extra in proptest::collection::vec((plain_key(), any::<String>()), 0..8),
        overrides in proptest::collection::vec((plain_key(), any::<String>()), 0..4),
    ) {
        let mut event = LogEvent::new();
        let mut from_extra = Vec::new();
        for (k, v) in &extra {
            event = event.with_extra(k.as_str(), v.as_str());
            upsert(&mut from_extra, k, v);
        }

        let mut expected = vec![("msg".to_string(), message.clone())];
        for (k, v) in &from_extra {
            upsert(&mut expected, k, v);
        }
        let line = bare_encoder().encode(&event.clone().with_message(message));
        prop_assert_eq!(parse_line(&line), expected);

        let mut expected = from_extra;
        for (k, v) in &overrides {
            upsert(&mut expected, k, v);
        }
        let structured: Fields = overrides.into_iter().collect();
        let line = bare_encoder().encode(&event.with_message(structured));
        prop_assert_eq!(parse_line(&line), expected);
    }
}
