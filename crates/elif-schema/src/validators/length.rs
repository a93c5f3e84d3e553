//! Length and size measurements for strings and collections

use serde_json::Value;

/// Character count of a string or element count of an array
pub fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Quantity compared by `min`/`max`.
///
/// Numbers compare by value, everything else by length. The branch is taken
/// on the runtime value, not on the declared schema type.
pub fn size_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        other => length_of(other).map(|len| len as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_length_of() {
        assert_eq!(length_of(&json!("héllo")), Some(5));
        assert_eq!(length_of(&json!([1, 2, 3])), Some(3));
        assert_eq!(length_of(&json!(12345)), None);
        assert_eq!(length_of(&json!({"a": 1})), None);
    }

    #[test]
    fn test_size_of_branches_on_runtime_type() {
        assert_eq!(size_of(&json!(42)), Some(42.0));
        assert_eq!(size_of(&json!("42")), Some(2.0));
        assert_eq!(size_of(&json!(["a"])), Some(1.0));
        assert_eq!(size_of(&json!(null)), None);
    }
}
