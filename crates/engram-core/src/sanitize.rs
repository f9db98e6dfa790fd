//! Metadata and log sanitization.
//!
//! Sensitive keys become `[REDACTED]`, long strings are truncated, and
//! recursion past the depth cap substitutes `[CIRCULAR_REFERENCE]`.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::constants::{MAX_LOGGED_STRING_BYTES, MAX_SANITIZE_DEPTH};

/// Placeholder for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Placeholder substituted past the recursion cap.
pub const CIRCULAR: &str = "[CIRCULAR_REFERENCE]";

fn sensitive_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(api[-_ ]?key|secret|password|token|auth|credential)")
            .expect("sensitive pattern is valid")
    })
}

/// Whether a metadata key matches any sensitive pattern.
pub fn is_sensitive_key(key: &str) -> bool {
    sensitive_pattern().is_match(key)
}

/// Truncate a string to the logging cap, appending the ellipsis marker.
pub fn truncate_string(s: &str) -> String {
    if s.len() <= MAX_LOGGED_STRING_BYTES {
        return s.to_string();
    }
    // Cut on a char boundary at or below the cap.
    let mut cut = MAX_LOGGED_STRING_BYTES;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}… (truncated)", &s[..cut])
}

/// Sanitize a JSON value for rendering or logging.
///
/// Objects and arrays are recursed; sensitive keys are replaced wholesale.
pub fn sanitize_value(value: &Value) -> Value {
    sanitize_at_depth(value, 0)
}

fn sanitize_at_depth(value: &Value, depth: usize) -> Value {
    if depth >= MAX_SANITIZE_DEPTH {
        return Value::String(CIRCULAR.to_string());
    }
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                if is_sensitive_key(key) {
                    out.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(key.clone(), sanitize_at_depth(v, depth + 1));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| sanitize_at_depth(v, depth + 1))
                .collect(),
        ),
        Value::String(s) => Value::String(truncate_string(s)),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_sensitive_keys() {
        let input = json!({
            "api_key": "sk-12345",
            "API-KEY": "sk-67890",
            "password": "hunter2",
            "authToken": "abc",
            "credential_file": "/tmp/creds",
            "normal": "visible",
        });
        let out = sanitize_value(&input);
        assert_eq!(out["api_key"], REDACTED);
        assert_eq!(out["API-KEY"], REDACTED);
        assert_eq!(out["password"], REDACTED);
        assert_eq!(out["authToken"], REDACTED);
        assert_eq!(out["credential_file"], REDACTED);
        assert_eq!(out["normal"], "visible");
    }

    #[test]
    fn redacts_nested_keys() {
        let input = json!({"outer": {"inner": {"secret": "x", "ok": 1}}});
        let out = sanitize_value(&input);
        assert_eq!(out["outer"]["inner"]["secret"], REDACTED);
        assert_eq!(out["outer"]["inner"]["ok"], 1);
    }

    #[test]
    fn truncates_long_strings() {
        let long = "a".repeat(800);
        let out = sanitize_value(&json!({ "note": long }));
        let s = out["note"].as_str().unwrap();
        assert!(s.ends_with("… (truncated)"));
        assert!(s.len() < 800);
    }

    #[test]
    fn deep_nesting_hits_circular_marker() {
        let mut v = json!("leaf");
        for _ in 0..80 {
            v = json!({ "next": v });
        }
        let out = sanitize_value(&v);
        let rendered = serde_json::to_string(&out).unwrap();
        assert!(rendered.contains(CIRCULAR));
    }

    #[test]
    fn arrays_recursed() {
        let input = json!([{"token": "t"}, "plain"]);
        let out = sanitize_value(&input);
        assert_eq!(out[0]["token"], REDACTED);
        assert_eq!(out[1], "plain");
    }
}
