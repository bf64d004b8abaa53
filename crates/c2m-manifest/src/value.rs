//! Truthiness helpers for JSON documents.

use serde_json::{Map, Value};

/// Returns `true` for `null`, `false`, zero, and empty strings, arrays or objects.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Returns a copy of `map` without its falsy entries. Nested values are kept as is.
pub fn without_falsy(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().filter(|(_, v)| !is_falsy(v)).collect()
}
