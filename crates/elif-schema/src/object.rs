//! Record schema: named field schemas plus cross-field rules

use crate::error::{settle, ErrorDetail, Fault, SchemaError, ValidationError, ValidationResult};
use crate::field::FieldSchema;
use crate::rules::{resolve_path, ObjectRule};
use crate::traits::{Node, SchemaRef};
use crate::validators::type_name;
use crate::Record;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Per-schema evaluation options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectOptions {
    /// Stop at the first failing field or rule
    pub abort_early: bool,
    /// Drop input keys that have no field schema
    pub strip_unknown: bool,
}

impl Default for ObjectOptions {
    fn default() -> Self {
        Self {
            abort_early: true,
            strip_unknown: false,
        }
    }
}

impl ObjectOptions {
    pub fn abort_early(mut self, abort_early: bool) -> Self {
        self.abort_early = abort_early;
        self
    }

    pub fn strip_unknown(mut self, strip_unknown: bool) -> Self {
        self.strip_unknown = strip_unknown;
        self
    }
}

/// Validates a record field by field, then checks relations between fields.
///
/// ```
/// use elif_schema::{number, object, string};
/// use serde_json::json;
///
/// let schema = object([("name", string().required()), ("age", number().integer())])
///     .xor(["email", "phone"]);
///
/// let outcome = schema.validate(json!({"name": "Ada", "email": "ada@example.com"})).unwrap();
/// assert!(outcome.is_valid());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: IndexMap<String, Arc<FieldSchema>>,
    options: ObjectOptions,
    rules: Vec<ObjectRule>,
    has_async: bool,
}

impl ObjectSchema {
    pub fn new<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Arc<FieldSchema>>,
    {
        fields
            .into_iter()
            .fold(Self::default(), |schema, (name, field)| schema.field(name, field))
    }

    pub fn fields(&self) -> &IndexMap<String, Arc<FieldSchema>> {
        &self.fields
    }

    pub fn options(&self) -> ObjectOptions {
        self.options
    }

    pub fn cross_field_rules(&self) -> &[ObjectRule] {
        &self.rules
    }

    pub fn requires_async(&self) -> bool {
        self.has_async
    }

    /// Declare (or replace) a field
    pub fn field(mut self, name: impl Into<String>, schema: impl Into<Arc<FieldSchema>>) -> Self {
        let schema = schema.into();
        self.has_async = self.has_async || schema.requires_async();
        self.fields.insert(name.into(), schema);
        self
    }

    pub fn with_options(mut self, options: ObjectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn abort_early(mut self, abort_early: bool) -> Self {
        self.options.abort_early = abort_early;
        self
    }

    pub fn strip_unknown(mut self, strip_unknown: bool) -> Self {
        self.options.strip_unknown = strip_unknown;
        self
    }

    fn relation(mut self, rule: ObjectRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// At least one of `peers` must be present
    pub fn or<S: Into<String>>(self, peers: impl IntoIterator<Item = S>) -> Self {
        self.relation(ObjectRule::Or(names(peers)))
    }

    /// If any of `peers` is present, all of them must be
    pub fn and<S: Into<String>>(self, peers: impl IntoIterator<Item = S>) -> Self {
        self.relation(ObjectRule::And(names(peers)))
    }

    /// Exactly one of `peers` must be present
    pub fn xor<S: Into<String>>(self, peers: impl IntoIterator<Item = S>) -> Self {
        self.relation(ObjectRule::Xor(names(peers)))
    }

    pub fn with<S: Into<String>>(self, key: impl Into<String>, peers: impl IntoIterator<Item = S>) -> Self {
        self.relation(ObjectRule::With {
            key: key.into(),
            peers: names(peers),
        })
    }

    pub fn without<S: Into<String>>(self, key: impl Into<String>, peers: impl IntoIterator<Item = S>) -> Self {
        self.relation(ObjectRule::Without {
            key: key.into(),
            peers: names(peers),
        })
    }

    /// The value at a dotted `path` of the validated record must satisfy `schema`
    pub fn assert(self, path: impl Into<String>, schema: impl Into<SchemaRef>) -> Self {
        self.push_assert(path.into(), schema.into(), None)
    }

    pub fn assert_with_message(
        self,
        path: impl Into<String>,
        schema: impl Into<SchemaRef>,
        message: impl Into<String>,
    ) -> Self {
        self.push_assert(path.into(), schema.into(), Some(message.into()))
    }

    fn push_assert(mut self, path: String, schema: SchemaRef, message: Option<String>) -> Self {
        self.has_async = self.has_async || schema.requires_async();
        self.relation(ObjectRule::Assert { path, schema, message })
    }

    /// Validate a record synchronously.
    ///
    /// `None` and `null` count as an empty record. Any other non-object input
    /// is a usage error, as is calling this on a schema with async rules.
    pub fn validate(&self, value: impl Into<Option<Value>>) -> ValidationResult {
        if self.has_async {
            return Err(SchemaError::AsyncRules);
        }
        let input = value.into();
        let working = self.working_record(top_level_record(input.as_ref())?);
        let outcome = self.run_record(&working).map(|output| Some(Value::Object(output)));
        settle(input, outcome)
    }

    /// Validate a record, awaiting any async rules
    pub async fn validate_async(&self, value: impl Into<Option<Value>>) -> ValidationResult {
        let input = value.into();
        let working = self.working_record(top_level_record(input.as_ref())?);
        let outcome = self
            .run_record_async(&working)
            .await
            .map(|output| Some(Value::Object(output)));
        settle(input, outcome)
    }

    fn working_record(&self, mut record: Record) -> Record {
        if self.options.strip_unknown {
            record.retain(|key, _| self.fields.contains_key(key));
        }
        record
    }

    /// Input keys in input order, then declared keys the input lacks
    fn key_order(&self, working: &Record) -> Vec<String> {
        let declared = self.fields.keys().filter(|key| !working.contains_key(key.as_str()));
        working.keys().chain(declared).cloned().collect()
    }

    fn store(&self, output: &mut Record, key: String, field: &FieldSchema, value: Option<Value>) {
        if field.is_stripped() {
            return;
        }
        if let Some(value) = value {
            output.insert(key, value);
        }
    }

    /// Record a failure; returns true when evaluation must stop
    fn record_failure(&self, errors: &mut ValidationError, detail: ErrorDetail) -> bool {
        errors.add(detail);
        self.options.abort_early
    }

    fn finish(&self, errors: ValidationError, output: Record) -> Result<Record, Fault> {
        tracing::debug!("Record validation finished with {} error(s)", errors.len());
        if errors.is_empty() {
            Ok(output)
        } else {
            Err(Fault::Invalid(errors))
        }
    }

    fn run_record(&self, working: &Record) -> Result<Record, Fault> {
        tracing::debug!("Validating record against {} field(s) (sync)", self.fields.len());
        let mut output = Record::new();
        let mut errors = ValidationError::new(Vec::new());

        for key in self.key_order(working) {
            let Some(field) = self.fields.get(&key) else {
                if let Some(value) = working.get(&key) {
                    output.insert(key, value.clone());
                }
                continue;
            };
            match field.run(working.get(&key).cloned(), working) {
                Ok(value) => self.store(&mut output, key, field, value),
                Err(Fault::Invalid(error)) => {
                    let detail = ErrorDetail::for_field(key, error.first_message());
                    if self.record_failure(&mut errors, detail) {
                        return self.finish(errors, output);
                    }
                }
                Err(misuse) => return Err(misuse),
            }
        }

        for rule in &self.rules {
            let failure = match rule {
                ObjectRule::Assert { path, schema, message } => {
                    let target = resolve_path(&output, path);
                    match schema.node().run(target, &output) {
                        Err(Fault::Invalid(error)) => Some(assert_message(path, message, &error)),
                        Err(misuse) => return Err(misuse),
                        Ok(_) => None,
                    }
                }
                presence => presence.presence_failure(&output),
            };
            if let Some(message) = failure {
                let detail = ErrorDetail::relation(rule.kind(), rule.field_label(), message);
                if self.record_failure(&mut errors, detail) {
                    break;
                }
            }
        }

        self.finish(errors, output)
    }

    async fn run_record_async(&self, working: &Record) -> Result<Record, Fault> {
        tracing::debug!("Validating record against {} field(s) (async)", self.fields.len());
        let mut output = Record::new();
        let mut errors = ValidationError::new(Vec::new());

        for key in self.key_order(working) {
            let Some(field) = self.fields.get(&key) else {
                if let Some(value) = working.get(&key) {
                    output.insert(key, value.clone());
                }
                continue;
            };
            match field.run_async(working.get(&key).cloned(), working).await {
                Ok(value) => self.store(&mut output, key, field, value),
                Err(Fault::Invalid(error)) => {
                    let detail = ErrorDetail::for_field(key, error.first_message());
                    if self.record_failure(&mut errors, detail) {
                        return self.finish(errors, output);
                    }
                }
                Err(misuse) => return Err(misuse),
            }
        }

        for rule in &self.rules {
            let failure = match rule {
                ObjectRule::Assert { path, schema, message } => {
                    let target = resolve_path(&output, path);
                    match schema.node().run_async(target, &output).await {
                        Err(Fault::Invalid(error)) => Some(assert_message(path, message, &error)),
                        Err(misuse) => return Err(misuse),
                        Ok(_) => None,
                    }
                }
                presence => presence.presence_failure(&output),
            };
            if let Some(message) = failure {
                let detail = ErrorDetail::relation(rule.kind(), rule.field_label(), message);
                if self.record_failure(&mut errors, detail) {
                    break;
                }
            }
        }

        self.finish(errors, output)
    }

    /// Record handed to a nested schema; non-objects are ordinary failures
    fn nested_record(&self, value: Option<Value>) -> Result<Record, Fault> {
        match value {
            None | Some(Value::Null) => Ok(Record::new()),
            Some(Value::Object(record)) => Ok(self.working_record(record)),
            Some(_) => Err(Fault::reject("must be an object")),
        }
    }
}

fn names<S: Into<String>>(peers: impl IntoIterator<Item = S>) -> Vec<String> {
    peers.into_iter().map(Into::into).collect()
}

fn top_level_record(value: Option<&Value>) -> Result<Record, SchemaError> {
    match value {
        None | Some(Value::Null) => Ok(Record::new()),
        Some(Value::Object(record)) => Ok(record.clone()),
        Some(other) => Err(SchemaError::NotARecord(type_name(other))),
    }
}

fn assert_message(path: &str, custom: &Option<String>, error: &ValidationError) -> String {
    match custom {
        Some(message) => message.clone(),
        None => format!("path '{}' failed validation: {}", path, error.first_message()),
    }
}

#[async_trait]
impl Node for ObjectSchema {
    fn run(&self, value: Option<Value>, _siblings: &Record) -> Result<Option<Value>, Fault> {
        let working = self.nested_record(value)?;
        self.run_record(&working).map(|output| Some(Value::Object(output)))
    }

    async fn run_async(&self, value: Option<Value>, _siblings: &Record) -> Result<Option<Value>, Fault> {
        let working = self.nested_record(value)?;
        self.run_record_async(&working)
            .await
            .map(|output| Some(Value::Object(output)))
    }

    fn requires_async(&self) -> bool {
        self.has_async
    }

    fn strips(&self) -> bool {
        false
    }
}
