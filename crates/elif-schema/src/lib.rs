//! # elif-schema
//!
//! Chainable runtime schema validation for the elif framework.
//! Schemas are declared with builder calls, then run against any
//! `serde_json::Value` in sync or async mode, producing either a normalized
//! value or an ordered list of failures.
//!
//! ```
//! use elif_schema::{array, number, object, string};
//! use serde_json::json;
//!
//! let signup = object([
//!     ("username", string().trim().lowercase().min(3).token().required()),
//!     ("age", number().integer().min(13)),
//!     ("tags", array().items(string().alphanum()).unique()),
//! ]);
//!
//! let outcome = signup.validate(json!({"username": " Ada ", "tags": ["rust"]})).unwrap();
//! assert_eq!(outcome.value, Some(json!({"username": "ada", "tags": ["rust"]})));
//! ```

pub mod error;
pub mod field;
pub mod object;
pub mod rules;
pub mod traits;
pub mod transform;
pub mod validators;

/// A JSON object being validated
pub type Record = serde_json::Map<String, serde_json::Value>;

pub use error::{
    DetailKind, ErrorDetail, SchemaError, Validation, ValidationError, ValidationResult,
    VALIDATION_STATUS_CODE,
};
pub use field::{FieldSchema, Flags, SchemaType, Shape};
pub use object::{ObjectOptions, ObjectSchema};
pub use rules::{reference, Limit, ObjectRule, Rule, RuleKind};
pub use traits::{AsyncPredicate, SchemaRef};
pub use transform::Transformer;

use std::sync::Arc;

pub fn string() -> FieldSchema {
    FieldSchema::new(SchemaType::String)
}

pub fn number() -> FieldSchema {
    FieldSchema::new(SchemaType::Number)
}

pub fn boolean() -> FieldSchema {
    FieldSchema::new(SchemaType::Boolean)
}

/// Array schema; pair with [`FieldSchema::items`] to validate elements
pub fn array() -> FieldSchema {
    FieldSchema::new(SchemaType::Array)
}

pub fn date() -> FieldSchema {
    FieldSchema::new(SchemaType::Date)
}

/// Untyped schema; the only kind that accepts [`FieldSchema::keys`]
pub fn any() -> FieldSchema {
    FieldSchema::new(SchemaType::Any)
}

/// Record schema with default [`ObjectOptions`]
pub fn object<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> ObjectSchema
where
    K: Into<String>,
    V: Into<Arc<FieldSchema>>,
{
    ObjectSchema::new(fields)
}

pub fn object_with<K, V>(fields: impl IntoIterator<Item = (K, V)>, options: ObjectOptions) -> ObjectSchema
where
    K: Into<String>,
    V: Into<Arc<FieldSchema>>,
{
    ObjectSchema::new(fields).with_options(options)
}
