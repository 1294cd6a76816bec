//! Small helpers for rule authors and the engine
//!
//! Copyright (c) 2025 Tform Contributors
//! Licensed under the Apache-2.0 license

use serde_json::Value;

/// Split `value` on `delimiter`, trim each piece and drop empty pieces
///
/// ```
/// use tform_core::split_list;
///
/// assert_eq!(split_list(",", "Biking, Skating,,"), vec!["Biking", "Skating"]);
/// ```
pub fn split_list(delimiter: &str, value: &str) -> Vec<String> {
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_owned)
        .collect()
}

/// One-element list for a present, non-null value; empty list otherwise
pub fn wrap_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => vec![value.clone()],
    }
}

/// Truthiness used for identity checks: `null`, `false`, `0` and `""` are
/// falsy, everything else is truthy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Textual form of a value; strings are returned without quotes
pub fn string_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
