//! Key-casing translation for hand-authored fixtures.
//!
//! Fixtures are written snake_case by convention; the wire schemas declare
//! camelCase field names. Translation runs only on the rewrite path (fixture
//! to wire), never on capture, so captured fixtures keep the wire casing and
//! re-translate as a no-op.

use serde_json::Value;

/// Translate a snake_case identifier to camelCase.
pub fn to_camel_case(snake: &str) -> String {
    let mut segments = snake.split('_');
    let mut out = String::with_capacity(snake.len());
    if let Some(first) = segments.next() {
        out.push_str(first);
    }
    for segment in segments {
        let mut chars = segment.chars();
        if let Some(head) = chars.next() {
            out.extend(head.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// Rewrite every mapping key in the tree to camelCase, in place.
///
/// Sequences are walked but their elements are not renamed; leaves are
/// untouched. Keys already camelCase contain no underscore and come back
/// unchanged.
pub fn camelize_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            for (key, mut child) in entries {
                camelize_keys(&mut child);
                map.insert(to_camel_case(&key), child);
            }
        }
        Value::Array(items) => {
            for item in items {
                camelize_keys(item);
            }
        }
        _ => {}
    }
}
