//! Validation error types and handling

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Advisory HTTP status carried by every [`ValidationError`]
pub const VALIDATION_STATUS_CODE: u16 = 400;

/// Outcome of calling `validate` / `validate_async` on a schema.
///
/// `Err` is reserved for API misuse; invalid input is reported through
/// [`Validation::error`].
pub type ValidationResult = Result<Validation, SchemaError>;

/// Origin of an error detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailKind {
    /// A field's own rule chain failed
    Field,
    Or,
    And,
    Xor,
    With,
    Without,
    Assert,
}

impl DetailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailKind::Field => "field",
            DetailKind::Or => "or",
            DetailKind::And => "and",
            DetailKind::Xor => "xor",
            DetailKind::With => "with",
            DetailKind::Without => "without",
            DetailKind::Assert => "assert",
        }
    }
}

impl fmt::Display for DetailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failure record inside a [`ValidationError`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    /// Field that failed. `None` when a field schema is validated standalone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable error message
    pub message: String,
    /// Whether the failure came from a field or from a cross-field rule
    #[serde(rename = "type")]
    pub kind: DetailKind,
}

impl ErrorDetail {
    /// Create a field-level detail with no field name attached yet
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
            kind: DetailKind::Field,
        }
    }

    /// Create a field-level detail for a named field
    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
            kind: DetailKind::Field,
        }
    }

    /// Create a detail produced by a cross-field rule
    pub fn relation(kind: DetailKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
            kind,
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Aggregate validation failure, one detail per failed field or rule
/// in evaluation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// All detail messages joined with `". "`
    pub message: String,
    pub details: Vec<ErrorDetail>,
    /// Always [`VALIDATION_STATUS_CODE`]; metadata for HTTP-adjacent callers
    pub status_code: u16,
}

impl ValidationError {
    /// Build an error from an ordered list of details
    pub fn new(details: Vec<ErrorDetail>) -> Self {
        let message = join_messages(&details);
        Self {
            message,
            details,
            status_code: VALIDATION_STATUS_CODE,
        }
    }

    /// Build an error holding exactly one unnamed field detail
    pub fn single(message: impl Into<String>) -> Self {
        Self::new(vec![ErrorDetail::new(message)])
    }

    /// Append a detail, keeping the joined message in sync
    pub fn add(&mut self, detail: ErrorDetail) {
        self.details.push(detail);
        self.message = join_messages(&self.details);
    }

    /// Message of the first detail, or an empty string
    pub fn first_message(&self) -> &str {
        self.details.first().map(|d| d.message.as_str()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Details recorded against a specific field
    pub fn field_errors(&self, field: &str) -> Vec<&ErrorDetail> {
        self.details
            .iter()
            .filter(|d| d.field.as_deref() == Some(field))
            .collect()
    }

    /// Check if a specific field has errors
    pub fn has_field_errors(&self, field: &str) -> bool {
        self.details.iter().any(|d| d.field.as_deref() == Some(field))
    }

    /// Flatten the details into `"field: msg, field2: msg2"`.
    ///
    /// Used when a nested record failure is reported through its parent field.
    pub fn collapse(&self) -> String {
        self.details
            .iter()
            .map(|d| format!("{}: {}", d.field.as_deref().unwrap_or(""), d.message))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Convert to a JSON-serializable format for API responses
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "error": {
                "code": "validation_failed",
                "message": self.message,
                "status": self.status_code,
                "details": self.details,
            }
        })
    }
}

fn join_messages(details: &[ErrorDetail]) -> String {
    details
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join(". ")
}

/// Misuse of the validation API, as opposed to invalid input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema has async rules, use validate_async() instead")]
    AsyncRules,

    #[error("expected a record (JSON object) but got {0}")]
    NotARecord(&'static str),
}

/// The `{ value, error }` pair returned by every validation entry point.
///
/// On failure `value` holds the original input, not a partially
/// validated one.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub value: Option<Value>,
    pub error: Option<ValidationError>,
}

impl Validation {
    pub fn valid(value: Option<Value>) -> Self {
        Self { value, error: None }
    }

    pub fn invalid(value: Option<Value>, error: ValidationError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// Drop the original input on failure and keep only the error
    pub fn into_result(self) -> Result<Option<Value>, ValidationError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.value),
        }
    }
}

/// Failure threaded through the engine internals
#[derive(Debug, Clone)]
pub(crate) enum Fault {
    Invalid(ValidationError),
    Misuse(SchemaError),
}

impl Fault {
    pub(crate) fn reject(message: impl Into<String>) -> Self {
        Fault::Invalid(ValidationError::single(message))
    }
}

impl From<SchemaError> for Fault {
    fn from(error: SchemaError) -> Self {
        Fault::Misuse(error)
    }
}

/// Turn an internal outcome into the public `{ value, error }` shape
pub(crate) fn settle(input: Option<Value>, outcome: Result<Option<Value>, Fault>) -> ValidationResult {
    match outcome {
        Ok(value) => Ok(Validation::valid(value)),
        Err(Fault::Invalid(error)) => Ok(Validation::invalid(input, error)),
        Err(Fault::Misuse(error)) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_joins_details() {
        let error = ValidationError::new(vec![
            ErrorDetail::for_field("a", "is required"),
            ErrorDetail::for_field("b", "must be positive"),
        ]);
        assert_eq!(error.message, "is required. must be positive");
        assert_eq!(error.to_string(), "is required. must be positive");
        assert_eq!(error.status_code, 400);
        assert_eq!(error.len(), 2);
    }

    #[test]
    fn test_add_keeps_message_in_sync() {
        let mut error = ValidationError::new(Vec::new());
        assert!(error.is_empty());
        assert_eq!(error.first_message(), "");

        error.add(ErrorDetail::relation(DetailKind::Xor, "a|b", "Exactly one of [a, b] is required."));
        assert_eq!(error.message, "Exactly one of [a, b] is required.");
        assert!(error.has_field_errors("a|b"));
        assert!(!error.has_field_errors("a"));
    }

    #[test]
    fn test_collapse_nested_details() {
        let error = ValidationError::new(vec![
            ErrorDetail::for_field("name", "is required"),
            ErrorDetail::for_field("age", "must be an integer"),
        ]);
        assert_eq!(error.collapse(), "name: is required, age: must be an integer");
    }

    #[test]
    fn test_to_json_shape() {
        let error = ValidationError::new(vec![ErrorDetail::for_field("email", "must be a valid email.")]);
        let payload = error.to_json();

        assert_eq!(payload["error"]["code"], "validation_failed");
        assert_eq!(payload["error"]["status"], 400);
        assert_eq!(payload["error"]["details"][0]["field"], "email");
        assert_eq!(payload["error"]["details"][0]["type"], "field");
    }

    #[test]
    fn test_unnamed_detail_skips_field_key() {
        let detail = serde_json::to_value(ErrorDetail::new("is required")).unwrap();
        assert_eq!(detail, json!({"message": "is required", "type": "field"}));
    }

    #[test]
    fn test_into_result() {
        let ok = Validation::valid(Some(json!(1)));
        assert!(ok.is_valid());
        assert_eq!(ok.into_result().unwrap(), Some(json!(1)));

        let failed = Validation::invalid(None, ValidationError::single("is required"));
        assert!(!failed.is_valid());
        assert_eq!(failed.into_result().unwrap_err().first_message(), "is required");
    }

    #[test]
    fn test_settle_separates_misuse() {
        let input = Some(json!("x"));
        let settled = settle(input.clone(), Err(Fault::reject("nope"))).unwrap();
        assert_eq!(settled.value, input);
        assert_eq!(settled.error.unwrap().first_message(), "nope");

        let misuse = settle(None, Err(SchemaError::AsyncRules.into()));
        assert_eq!(misuse.unwrap_err(), SchemaError::AsyncRules);
    }
}
