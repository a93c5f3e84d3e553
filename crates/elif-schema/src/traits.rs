//! Core traits shared by field and record schemas

use crate::error::{settle, Fault, SchemaError, ValidationResult};
use crate::field::FieldSchema;
use crate::object::ObjectSchema;
use crate::Record;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Asynchronous predicate attached with `custom_async`.
///
/// Implemented for any `Fn(Value, Record) -> impl Future<Output = bool>`,
/// so plain async closures can be used directly.
#[async_trait]
pub trait AsyncPredicate: Send + Sync {
    /// Test a present value against the sibling record it was found in
    async fn test(&self, value: &Value, siblings: &Record) -> bool;
}

#[async_trait]
impl<F, Fut> AsyncPredicate for F
where
    F: Fn(Value, Record) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    async fn test(&self, value: &Value, siblings: &Record) -> bool {
        (self)(value.clone(), siblings.clone()).await
    }
}

/// A schema node the engine can recurse into
#[async_trait]
pub(crate) trait Node: Send + Sync {
    fn run(&self, value: Option<Value>, siblings: &Record) -> Result<Option<Value>, Fault>;

    async fn run_async(&self, value: Option<Value>, siblings: &Record) -> Result<Option<Value>, Fault>;

    fn requires_async(&self) -> bool;

    /// Whether a successful result should be dropped from the parent's output
    fn strips(&self) -> bool;
}

/// Shared handle to a sub-schema used by `items`, `has` and `assert`.
///
/// Built from a [`FieldSchema`] or an [`ObjectSchema`], owned or already in
/// an `Arc`. Cloning shares the underlying schema.
#[derive(Clone)]
pub struct SchemaRef(Arc<dyn Node>);

impl SchemaRef {
    pub(crate) fn node(&self) -> &dyn Node {
        self.0.as_ref()
    }

    /// Whether validation must go through [`SchemaRef::validate_async`]
    pub fn requires_async(&self) -> bool {
        self.0.requires_async()
    }

    /// Validate a standalone value synchronously
    pub fn validate(&self, value: impl Into<Option<Value>>) -> ValidationResult {
        if self.requires_async() {
            return Err(SchemaError::AsyncRules);
        }
        let input = value.into();
        let outcome = self.0.run(input.clone(), &Record::new());
        settle(input, outcome)
    }

    /// Validate a standalone value, awaiting any async rules
    pub async fn validate_async(&self, value: impl Into<Option<Value>>) -> ValidationResult {
        let input = value.into();
        let outcome = self.0.run_async(input.clone(), &Record::new()).await;
        settle(input, outcome)
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRef")
            .field("requires_async", &self.requires_async())
            .field("strips", &self.0.strips())
            .finish()
    }
}

impl From<FieldSchema> for SchemaRef {
    fn from(schema: FieldSchema) -> Self {
        SchemaRef(Arc::new(schema))
    }
}

impl From<Arc<FieldSchema>> for SchemaRef {
    fn from(schema: Arc<FieldSchema>) -> Self {
        SchemaRef(schema)
    }
}

impl From<ObjectSchema> for SchemaRef {
    fn from(schema: ObjectSchema) -> Self {
        SchemaRef(Arc::new(schema))
    }
}

impl From<Arc<ObjectSchema>> for SchemaRef {
    fn from(schema: Arc<ObjectSchema>) -> Self {
        SchemaRef(schema)
    }
}
