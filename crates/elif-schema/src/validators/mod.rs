//! Built-in leaf predicates backing the chainable rules
//!
//! Every function here is a plain `&Value -> bool` check. The engine treats
//! them as opaque; they never see the schema they belong to.

pub mod card;
pub mod collection;
pub mod format;
pub mod length;
pub mod numeric;

use serde_json::Value;
use std::borrow::Cow;

pub use card::is_credit_card;
pub use collection::is_unique;
pub use format::{
    is_alphanum, is_email, is_hex, is_ip, is_ip4, is_ip6, is_iso_date, is_token, is_uuid,
};
pub use length::{length_of, size_of};
pub use numeric::{is_integer, is_negative, is_port, is_positive};

/// Text form of a scalar used by pattern-style rules.
///
/// Strings are used as-is; numbers and booleans use their decimal/literal
/// rendering. Arrays, objects and null have no text form.
pub fn text_of(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

/// Short JSON type name, used in usage errors
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Equality used by membership and uniqueness rules.
///
/// Numbers compare by numeric value, so `1` and `1.0` are the same value.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Render values the way rule messages list them: `a, 1, true`
pub(crate) fn display_list(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
