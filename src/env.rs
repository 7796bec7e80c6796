//! Environment variable names used by this crate for convenient
//! configuration of the encoder from services.
//!
//! These are purely helpers; [`Logfmter`](crate::encoder::Logfmter) itself
//! never reads the environment.

use std::collections::BTreeMap;

use crate::encoder::EncoderConfig;

/// Comma separated requested keys, e.g. `at,when,logger`.
pub const LOGFMT_KEYS_ENV: &str = "LOGFMT_KEYS";

/// Comma separated `key=attribute` pairs, e.g. `at=levelname,when=asctime`.
pub const LOGFMT_MAPPING_ENV: &str = "LOGFMT_MAPPING";

/// strftime format for timestamp values.
pub const LOGFMT_DATEFMT_ENV: &str = "LOGFMT_DATEFMT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Split a comma separated key list, dropping empty entries.
pub fn parse_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `key=attribute` pairs. Entries without `=` map a key to itself.
pub fn parse_mapping(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, attribute)) => (key.trim().to_string(), attribute.trim().to_string()),
            None => (pair.to_string(), pair.to_string()),
        })
        .collect()
}

/// Build an [`EncoderConfig`] from a variable lookup, starting from the
/// defaults and overriding whatever is set.
pub fn encoder_config_from<F>(lookup: F) -> EncoderConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = EncoderConfig::default();
    if let Some(keys) = lookup(LOGFMT_KEYS_ENV) {
        config.keys = parse_keys(&keys);
    }
    if let Some(mapping) = lookup(LOGFMT_MAPPING_ENV) {
        config.mapping = parse_mapping(&mapping);
    }
    if let Some(datefmt) = lookup(LOGFMT_DATEFMT_ENV) {
        config.datefmt = Some(datefmt);
    }
    config
}

/// [`encoder_config_from`] over the process environment.
pub fn encoder_config_from_env() -> EncoderConfig {
    encoder_config_from(|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_key_lists() {
        assert_eq!(parse_keys("at, when ,,logger"), ["at", "when", "logger"]);
        assert!(parse_keys("").is_empty());
    }

    #[test]
    fn parses_mappings() {
        let mapping = parse_mapping("at=levelname, when = asctime,pid");
        assert_eq!(mapping.get("at").map(String::as_str), Some("levelname"));
        assert_eq!(mapping.get("when").map(String::as_str), Some("asctime"));
        assert_eq!(mapping.get("pid").map(String::as_str), Some("pid"));
    }

    #[test]
    fn unset_variables_keep_defaults() {
        let config = encoder_config_from(|_| None);
        assert_eq!(config, EncoderConfig::default());
    }

    #[test]
    fn set_variables_override_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (LOGFMT_KEYS_ENV, "at,when"),
            (LOGFMT_MAPPING_ENV, "at=levelname,when=asctime"),
            (LOGFMT_DATEFMT_ENV, "%H:%M"),
        ]);
        let config = encoder_config_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.keys, ["at", "when"]);
        assert_eq!(config.mapping.len(), 2);
        assert_eq!(config.datefmt.as_deref(), Some("%H:%M"));
    }

    #[test]
    fn env_or_falls_back() {
        assert_eq!(env_or("LOGFMT_SURELY_UNSET_VARIABLE", "fallback"), "fallback");
    }
}
