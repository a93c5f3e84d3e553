//! Value transformers applied before any rule runs

use serde_json::Value;
use std::sync::Arc;

/// Rewrites a possibly-absent value. `None` stands for a missing value.
pub type Transformer = Arc<dyn Fn(Option<Value>) -> Option<Value> + Send + Sync>;

fn map_string<F>(f: F) -> Transformer
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    Arc::new(move |value| match value {
        Some(Value::String(s)) => Some(Value::String(f(&s))),
        other => other,
    })
}

/// Strip leading and trailing whitespace from strings
pub fn trim() -> Transformer {
    map_string(|s| s.trim().to_string())
}

pub fn lowercase() -> Transformer {
    map_string(str::to_lowercase)
}

pub fn uppercase() -> Transformer {
    map_string(str::to_uppercase)
}

/// Substitute `fallback` for a missing or null value
pub fn default_to(fallback: Value) -> Transformer {
    Arc::new(move |value| match value {
        None | Some(Value::Null) => Some(fallback.clone()),
        present => present,
    })
}

/// Wrap a present non-array value into a one-element array.
/// Missing values stay missing.
pub fn single() -> Transformer {
    Arc::new(|value| match value {
        Some(Value::Array(items)) => Some(Value::Array(items)),
        Some(other) => Some(Value::Array(vec![other])),
        None => None,
    })
}
