// Utility functions and helpers
// Path handling and numeric coercion shared by lookups, methods and operators

use std::num::ParseFloatError;

use crate::value::Value;

/// Split a dotted path into its segments.
///
/// An empty path and a leading `this` both refer to the root the path is
/// resolved against, so `"this.foo.bar"` and `"foo.bar"` are equivalent.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = path
        .split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if segments.first().map(String::as_str) == Some("this") {
        segments.remove(0);
    }
    segments
}

/// Walk `path` into `root`. Object segments are keys; array segments must be
/// unsigned integer indices.
pub fn walk<'v>(root: &'v Value, path: &[String]) -> Option<&'v Value> {
    let mut current = root;
    for segment in path {
        current = match current {
            Value::Array(_) => current.get_index(segment.parse::<usize>().ok()?)?,
            _ => current.get(segment)?,
        };
    }
    Some(current)
}

/// Resolve `path` against `root`, yielding `Nothing` when any step is missing.
pub fn lookup(root: &Value, path: &[String]) -> Value {
    walk(root, path).cloned().unwrap_or(Value::Nothing)
}

/// Parse a numeric literal. The error text is surfaced verbatim in coercion
/// failures.
pub fn parse_number(s: &str) -> Result<f64, ParseFloatError> {
    s.parse::<f64>()
}

/// Numbers pass through; strings holding a numeric literal are parsed.
pub fn coerce_number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| parse_number(s).ok()))
}
