//! Array-level predicates

use serde_json::Value;
use std::collections::HashSet;

/// True when the value is an array without duplicate elements.
///
/// Elements are compared structurally through their canonical JSON text;
/// numbers by numeric value, so `1` and `1.0` collide.
pub fn is_unique(value: &Value) -> bool {
    let Some(items) = value.as_array() else {
        return false;
    };

    let mut seen = HashSet::with_capacity(items.len());
    items.iter().all(|item| seen.insert(unique_key(item)))
}

fn unique_key(item: &Value) -> String {
    match item.as_f64() {
        Some(n) if item.is_number() => format!("#{}", n),
        _ => item.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unique() {
        assert!(is_unique(&json!(["a", "b", "c"])));
        assert!(is_unique(&json!([])));
        assert!(!is_unique(&json!(["a", "b", "a"])));
        assert!(!is_unique(&json!([{"id": 1}, {"id": 1}])));
    }

    #[test]
    fn test_string_and_number_are_distinct() {
        assert!(is_unique(&json!(["1", 1])));
    }

    #[test]
    fn test_equal_numbers_are_duplicates() {
        let mixed: Value = serde_json::from_str("[1, 1.0]").unwrap();
        assert!(!is_unique(&mixed));
        assert!(is_unique(&json!([1, 2.5, "1"])));
    }

    #[test]
    fn test_non_array_fails() {
        assert!(!is_unique(&json!("aba")));
    }
}
