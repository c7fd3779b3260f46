//! Structured JSON logging and secret redaction.
//!
//! Every log record is one JSON object per line with the fields spec.md §6
//! requires (`timestamp, level, logger, message, run_id, cycle_id, ...`),
//! emitted via `tracing`'s scoped fields rather than a hidden contextual
//! stack. [`redact`] is applied to any field map built from request/response
//! payloads before it reaches the writer; ported from
//! `original_source/src/btcbot/security/redaction.py`.

use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

const REDACTED: &str = "***REDACTED***";
const SENSITIVE_KEYWORDS: &[&str] =
    &["secret", "token", "password", "api_key", "apikey", "auth", "private_key", "access_key", "signature"];

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SENSITIVE_KEYWORDS.iter().any(|word| lowered.contains(word))
}

/// Recursively redacts a JSON value: any object key matching a sensitive
/// keyword has its value replaced wholesale; strings are additionally
/// scanned for known literal secret patterns (`btcturk_api_key=...`,
/// `btcturk_api_secret=...`, `x-signature=...`).
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                if is_sensitive_key(key) {
                    sanitized.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    sanitized.insert(key.clone(), redact(item));
                }
            }
            Value::Object(sanitized)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        Value::String(s) => Value::String(redact_text(s)),
        other => other.clone(),
    }
}

fn redact_text(value: &str) -> String {
    const PATTERNS: &[(&str, usize)] =
        &[("btcturk_api_key", "btcturk_api_key".len()), ("btcturk_api_secret", "btcturk_api_secret".len()), ("x-signature", "x-signature".len())];
    let lowered = value.to_ascii_lowercase();
    for (needle, prefix_len) in PATTERNS {
        if let Some(pos) = lowered.find(needle) {
            let after_key = &value[pos + prefix_len..];
            if let Some(sep_offset) = after_key.find(|c: char| c == '=' || c == ':') {
                let value_start = pos + prefix_len + sep_offset + 1;
                let tail = &value[value_start..];
                let value_len = tail.find([' ', ',', ';']).unwrap_or(tail.len());
                let mut out = String::with_capacity(value.len());
                out.push_str(&value[..value_start]);
                out.push_str(REDACTED);
                out.push_str(&value[value_start + value_len..]);
                return redact_text(&out);
            }
        }
    }
    value.to_string()
}

/// Installs a global `tracing` subscriber writing JSON lines to stdout,
/// filtered by `log_level`/`httpx_log_level` (the latter scoped to the
/// `reqwest`/`hyper` targets an HTTP exchange client would use).
pub fn init_tracing(log_level: &str, httpx_log_level: &str) {
    let filter = EnvFilter::new(format!("{log_level},hyper={httpx_log_level},reqwest={httpx_log_level}"));
    fmt().json().with_env_filter(filter).with_target(true).with_current_span(true).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_sensitive_keys_recursively() {
        let input = json!({
            "api_key": "abc123",
            "nested": {"auth_token": "xyz", "symbol": "BTCTRY"},
            "list": [{"password": "hunter2"}],
        });
        let out = redact(&input);
        assert_eq!(out["api_key"], REDACTED);
        assert_eq!(out["nested"]["auth_token"], REDACTED);
        assert_eq!(out["nested"]["symbol"], "BTCTRY");
        assert_eq!(out["list"][0]["password"], REDACTED);
    }

    #[test]
    fn redacts_inline_literal_patterns_in_strings() {
        let input = json!("btcturk_api_secret=supersecretvalue rest of message");
        let out = redact(&input);
        assert_eq!(out, json!(format!("btcturk_api_secret={REDACTED} rest of message")));
    }

    #[test]
    fn leaves_non_sensitive_strings_untouched() {
        let input = json!("order filled at 100.5");
        assert_eq!(redact(&input), input);
    }
}
