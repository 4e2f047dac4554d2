//! JSON value helpers shared by the provider-facing clients.

use serde_json::Value;

/// Renders a scalar JSON value as a string. Provider APIs flip between
/// numbers and strings for ids, statuses and rates.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn scalar_to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First part of a response body, for error messages.
pub fn body_snippet(raw: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = raw.trim();
    if trimmed.chars().count() <= LIMIT {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(LIMIT).collect();
        format!("{head}...")
    }
}
