//! Numeric predicates

use serde_json::Value;

/// A number without a fractional part
pub fn is_integer(value: &Value) -> bool {
    value
        .as_f64()
        .map_or(false, |n| n.is_finite() && n.fract() == 0.0)
}

pub fn is_positive(value: &Value) -> bool {
    value.as_f64().map_or(false, |n| n > 0.0)
}

pub fn is_negative(value: &Value) -> bool {
    value.as_f64().map_or(false, |n| n < 0.0)
}

/// Integer in `0..=65535`
pub fn is_port(value: &Value) -> bool {
    is_integer(value) && value.as_f64().map_or(false, |n| (0.0..=65535.0).contains(&n))
}
