//! Lenient JSON Extraction
//!
//! Pulls a structured JSON object out of raw subprocess output. Both
//! sub-invocations (the container test harness and the fix agent) may
//! interleave diagnostic text with their JSON result, or truncate it
//! entirely, so parsing degrades to `None` rather than erroring.

use serde_json::Value;

/// Extract a JSON object from raw process output.
///
/// Strategy, in order:
/// 1. Parse the whole trimmed text as JSON.
/// 2. Parse from the first `{` to the end of the text.
/// 3. Give up and return `None`.
///
/// Only JSON objects qualify; a bare array or scalar is treated as
/// "no structured result available".
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    if let Some(brace_idx) = trimmed.find('{') {
        if let Ok(value) = serde_json::from_str::<Value>(&trimmed[brace_idx..]) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    None
}
