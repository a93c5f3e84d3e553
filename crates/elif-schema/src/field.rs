//! Field-level schema: transformers, presence flags and an ordered rule chain

use crate::error::{settle, Fault, SchemaError, ValidationError, ValidationResult};
use crate::object::ObjectSchema;
use crate::rules::{is_present, Check, Limit, Rule, RuleKind};
use crate::traits::{AsyncPredicate, Node, SchemaRef};
use crate::transform::{self, Transformer};
use crate::validators::{self, display_list, length_of, same_value, size_of, text_of};
use crate::Record;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

const REQUIRED: &str = "is required";
const NOT_AN_ARRAY: &str = "must be an array";

/// Declared type of a field schema. Advisory only: rules decide on the
/// runtime value, and only `Array` and `Any` unlock shape recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Boolean,
    Array,
    Date,
    Any,
}

/// Presence flags of a field schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub optional: bool,
    pub nullable: bool,
    pub strip: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            optional: true,
            nullable: false,
            strip: false,
        }
    }
}

/// Structural recursion performed after the rule chain passes
#[derive(Debug, Clone)]
pub enum Shape {
    Scalar,
    /// Every element is validated against the item schema
    Array(SchemaRef),
    /// The value is validated as a nested record
    Record(Arc<ObjectSchema>),
}

enum Gate {
    /// Validation is finished with this value
    Settled(Option<Value>),
    /// A present value that still has to go through the rules
    Present(Value),
}

/// Chainable description of the constraints on a single value.
///
/// Built by value, then immutable; share it behind an `Arc` to reuse it
/// across concurrent validations.
///
/// ```
/// use serde_json::json;
///
/// let username = elif_schema::string().trim().lowercase().min(3).token();
/// let outcome = username.validate(json!("  USER_123 ")).unwrap();
///
/// assert_eq!(outcome.value, Some(json!("user_123")));
/// assert!(outcome.error.is_none());
/// ```
#[derive(Clone)]
pub struct FieldSchema {
    kind: SchemaType,
    shape: Shape,
    rules: Vec<Rule>,
    transformers: Vec<Transformer>,
    flags: Flags,
    meta: Record,
    has_async: bool,
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .field("rules", &self.rules.iter().map(Rule::kind).collect::<Vec<_>>())
            .field("transformers_count", &self.transformers.len())
            .field("flags", &self.flags)
            .field("has_async", &self.has_async)
            .finish()
    }
}

impl FieldSchema {
    pub fn new(kind: SchemaType) -> Self {
        Self {
            kind,
            shape: Shape::Scalar,
            rules: Vec::new(),
            transformers: Vec::new(),
            flags: Flags::default(),
            meta: Record::new(),
            has_async: false,
        }
    }

    pub fn kind(&self) -> SchemaType {
        self.kind
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn metadata(&self) -> &Record {
        &self.meta
    }

    /// Whether any rule here or in a sub-schema is asynchronous
    pub fn requires_async(&self) -> bool {
        self.has_async
    }

    pub fn is_stripped(&self) -> bool {
        self.flags.strip
    }

    fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    fn predicate<F>(self, kind: RuleKind, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &Record) -> bool + Send + Sync + 'static,
    {
        self.rule(Rule::predicate(kind, message, predicate))
    }

    fn transformer(mut self, transformer: Transformer) -> Self {
        self.transformers.push(transformer);
        self
    }

    // --- presence ---

    pub fn required(mut self) -> Self {
        self.flags.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.flags.optional = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.flags.nullable = true;
        self
    }

    /// Accept the value but drop it from the validated output
    pub fn strip(mut self) -> Self {
        self.flags.strip = true;
        self
    }

    /// Fail whenever a value is present
    pub fn forbidden(self) -> Self {
        self.predicate(RuleKind::Forbidden, "is forbidden", |v, _| !is_present(Some(v)))
    }

    /// Substitute `value` when the input is missing or null
    pub fn default(self, value: impl Into<Value>) -> Self {
        self.transformer(transform::default_to(value.into()))
    }

    // --- membership ---

    pub fn valid<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let allowed: Vec<Value> = values.into_iter().map(Into::into).collect();
        let message = format!("must be one of [{}]", display_list(&allowed));
        self.predicate(RuleKind::Valid, message, move |v, _| allowed.iter().any(|a| same_value(a, v)))
    }

    pub fn invalid<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let denied: Vec<Value> = values.into_iter().map(Into::into).collect();
        let message = format!("must not be one of [{}]", display_list(&denied));
        self.predicate(RuleKind::Invalid, message, move |v, _| !denied.iter().any(|d| same_value(d, v)))
    }

    /// Alias of [`FieldSchema::valid`]
    pub fn one_of<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.valid(values)
    }

    /// Alias of [`FieldSchema::invalid`]
    pub fn not_one_of<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.invalid(values)
    }

    // --- custom logic ---

    /// Append a caller-supplied transformer. `None` stands for a missing value.
    pub fn transform<F>(self, f: F) -> Self
    where
        F: Fn(Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.transformer(Arc::new(f))
    }

    /// Synchronous predicate over `(value, sibling record)`
    pub fn custom<F>(self, predicate: F) -> Self
    where
        F: Fn(&Value, &Record) -> bool + Send + Sync + 'static,
    {
        self.predicate(RuleKind::Custom, "failed custom validation", predicate)
    }

    /// Asynchronous predicate. A schema holding one can only be validated
    /// with `validate_async`.
    pub fn custom_async<F, Fut>(mut self, predicate: F) -> Self
    where
        F: Fn(Value, Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.has_async = true;
        let predicate: Arc<dyn AsyncPredicate> = Arc::new(predicate);
        self.rule(Rule::new(RuleKind::CustomAsync, Check::Async(predicate), "failed async validation"))
    }

    /// Append the rules and transformers of `other`, keeping their order.
    ///
    /// An item or nested-record schema on `other` replaces the one held here.
    pub fn concat(mut self, other: &FieldSchema) -> Self {
        match &other.shape {
            Shape::Scalar => {}
            Shape::Array(_) => {
                self.rules.retain(|rule| rule.kind() != RuleKind::Items);
                self.shape = other.shape.clone();
            }
            Shape::Record(_) => self.shape = other.shape.clone(),
        }
        self.rules.extend(other.rules.iter().cloned());
        self.transformers.extend(other.transformers.iter().cloned());
        self.has_async = self.has_async || other.has_async;
        self
    }

    /// Merge an object of inert metadata
    pub fn meta(mut self, info: Value) -> Self {
        match info {
            Value::Object(entries) => self.meta.extend(entries),
            other => tracing::warn!("Ignoring non-object schema metadata: {}", other),
        }
        self
    }

    /// Override the failure message of the most recently added rule
    pub fn message(mut self, message: impl Into<String>) -> Self {
        match self.rules.last_mut() {
            Some(rule) => rule.set_custom_message(message.into()),
            None => tracing::warn!("message() called on a schema with no rules"),
        }
        self
    }

    // --- size ---

    /// Numbers compare by value, strings and arrays by length
    pub fn min(self, limit: impl Into<Limit>) -> Self {
        let limit = limit.into();
        let message = format!("must be at least {}", limit);
        self.predicate(RuleKind::Min, message, move |v, siblings| {
            matches!((size_of(v), limit.resolve(siblings)), (Some(size), Some(bound)) if size >= bound)
        })
    }

    /// Numbers compare by value, strings and arrays by length
    pub fn max(self, limit: impl Into<Limit>) -> Self {
        let limit = limit.into();
        let message = format!("must be at most {}", limit);
        self.predicate(RuleKind::Max, message, move |v, siblings| {
            matches!((size_of(v), limit.resolve(siblings)), (Some(size), Some(bound)) if size <= bound)
        })
    }

    pub fn length(self, limit: impl Into<Limit>) -> Self {
        let limit = limit.into();
        let message = format!("length must be exactly {}", limit);
        self.predicate(RuleKind::Length, message, move |v, siblings| {
            matches!((length_of(v), limit.resolve(siblings)), (Some(len), Some(bound)) if len as f64 == bound)
        })
    }

    // --- strings ---

    pub fn pattern(self, regex: Regex) -> Self {
        self.predicate(RuleKind::Pattern, "fails to match pattern", move |v, _| {
            text_of(v).map_or(false, |text| regex.is_match(&text))
        })
    }

    pub fn credit_card(self) -> Self {
        self.predicate(RuleKind::CreditCard, "must be a valid credit card number", |v, _| {
            validators::is_credit_card(v)
        })
    }

    pub fn ip4(self) -> Self {
        self.predicate(RuleKind::Ip4, "must be a valid IPv4 address", |v, _| validators::is_ip4(v))
    }

    pub fn ip6(self) -> Self {
        self.predicate(RuleKind::Ip6, "must be a valid IPv6 address", |v, _| validators::is_ip6(v))
    }

    pub fn ip(self) -> Self {
        self.predicate(RuleKind::Ip, "must be a valid IP address", |v, _| validators::is_ip(v))
    }

    pub fn email(self) -> Self {
        self.predicate(RuleKind::Email, "must be a valid email.", |v, _| validators::is_email(v))
    }

    pub fn uuid(self) -> Self {
        self.predicate(RuleKind::Uuid, "must be a valid UUID", |v, _| validators::is_uuid(v))
    }

    pub fn hex(self) -> Self {
        self.predicate(RuleKind::Hex, "must be a hexadecimal string", |v, _| validators::is_hex(v))
    }

    pub fn token(self) -> Self {
        self.predicate(RuleKind::Token, "must be a valid token", |v, _| validators::is_token(v))
    }

    pub fn iso_date(self) -> Self {
        self.predicate(RuleKind::IsoDate, "must be a valid ISO date", |v, _| validators::is_iso_date(v))
    }

    pub fn alphanum(self) -> Self {
        self.predicate(RuleKind::Alphanum, "must only contain alphanumeric characters.", |v, _| {
            validators::is_alphanum(v)
        })
    }

    pub fn trim(self) -> Self {
        self.transformer(transform::trim())
    }

    pub fn lowercase(self) -> Self {
        self.transformer(transform::lowercase())
    }

    pub fn uppercase(self) -> Self {
        self.transformer(transform::uppercase())
    }

    // --- numbers ---

    pub fn greater(self, limit: impl Into<Limit>) -> Self {
        let limit = limit.into();
        let message = format!("must be greater than {}", limit);
        self.predicate(RuleKind::Greater, message, move |v, siblings| {
            matches!((v.as_f64(), limit.resolve(siblings)), (Some(n), Some(bound)) if n > bound)
        })
    }

    pub fn less(self, limit: impl Into<Limit>) -> Self {
        let limit = limit.into();
        let message = format!("must be less than {}", limit);
        self.predicate(RuleKind::Less, message, move |v, siblings| {
            matches!((v.as_f64(), limit.resolve(siblings)), (Some(n), Some(bound)) if n < bound)
        })
    }

    pub fn integer(self) -> Self {
        self.predicate(RuleKind::Integer, "must be an integer", |v, _| validators::is_integer(v))
    }

    pub fn positive(self) -> Self {
        self.predicate(RuleKind::Positive, "must be positive", |v, _| validators::is_positive(v))
    }

    pub fn negative(self) -> Self {
        self.predicate(RuleKind::Negative, "must be negative", |v, _| validators::is_negative(v))
    }

    pub fn port(self) -> Self {
        self.predicate(RuleKind::Port, "must be a valid port", |v, _| validators::is_port(v))
    }

    // --- arrays ---

    /// Validate every element of an `array` schema against `schema`.
    /// Calling it again replaces the item schema.
    pub fn items(mut self, schema: impl Into<SchemaRef>) -> Self {
        let schema = schema.into();
        if self.kind != SchemaType::Array {
            tracing::warn!("items() on a {:?} schema is ignored; use array()", self.kind);
            return self;
        }
        self.has_async = self.has_async || schema.requires_async();
        self.shape = Shape::Array(schema);
        self.rules.retain(|rule| rule.kind() != RuleKind::Items);
        self.rule(Rule::new(RuleKind::Items, Check::Items, ""))
    }

    pub fn unique(self) -> Self {
        self.predicate(RuleKind::Unique, "must contain unique values", |v, _| validators::is_unique(v))
    }

    /// Require at least one element matching `schema`
    pub fn has(mut self, schema: impl Into<SchemaRef>) -> Self {
        let schema = schema.into();
        self.has_async = self.has_async || schema.requires_async();
        self.rule(Rule::new(
            RuleKind::Has,
            Check::Contains(schema),
            "must contain at least one required item",
        ))
    }

    /// Wrap a single value into an array
    pub fn single(self) -> Self {
        self.transformer(transform::single())
    }

    // --- records ---

    /// Validate the value as a nested record with default options
    pub fn keys<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Arc<FieldSchema>>,
    {
        if self.kind != SchemaType::Any {
            tracing::warn!("keys() on a {:?} schema is ignored; use any()", self.kind);
            return self;
        }
        let nested = ObjectSchema::new(fields);
        self.has_async = self.has_async || nested.requires_async();
        self.shape = Shape::Record(Arc::new(nested));
        self
    }

    // --- execution ---

    /// Validate synchronously. Fails with [`SchemaError::AsyncRules`] when the
    /// schema holds asynchronous rules.
    pub fn validate(&self, value: impl Into<Option<Value>>) -> ValidationResult {
        if self.has_async {
            return Err(SchemaError::AsyncRules);
        }
        let input = value.into();
        let outcome = self.run(input.clone(), &Record::new());
        settle(input, outcome)
    }

    /// Validate, awaiting any asynchronous rules
    pub async fn validate_async(&self, value: impl Into<Option<Value>>) -> ValidationResult {
        let input = value.into();
        let outcome = self.run_async(input.clone(), &Record::new()).await;
        settle(input, outcome)
    }

    /// Transformers, strip, then the presence gate
    fn gate(&self, value: Option<Value>) -> Result<Gate, Fault> {
        let value = self.transformers.iter().fold(value, |current, t| t(current));

        if self.flags.strip {
            return Ok(Gate::Settled(None));
        }

        match value {
            Some(value) if !value.is_null() => Ok(Gate::Present(value)),
            _ if !self.flags.optional => Err(Fault::reject(REQUIRED)),
            Some(Value::Null) if self.flags.nullable => Ok(Gate::Settled(Some(Value::Null))),
            absent => Ok(Gate::Settled(absent)),
        }
    }

    fn rejected(&self, rule: &Rule) -> Fault {
        tracing::trace!("Rule {:?} rejected {:?} value", rule.kind(), self.kind);
        Fault::reject(rule.message())
    }

    fn check_rules(&self, value: &Value, siblings: &Record) -> Result<(), Fault> {
        for rule in &self.rules {
            let passed = match rule.check() {
                Check::Sync(predicate) => predicate(value, siblings),
                Check::Async(_) => return Err(SchemaError::AsyncRules.into()),
                Check::Contains(schema) => contains(schema, value)?,
                Check::Items => true,
            };
            if !passed {
                return Err(self.rejected(rule));
            }
        }
        Ok(())
    }

    async fn check_rules_async(&self, value: &Value, siblings: &Record) -> Result<(), Fault> {
        for rule in &self.rules {
            let passed = match rule.check() {
                Check::Sync(predicate) => predicate(value, siblings),
                Check::Async(predicate) => predicate.test(value, siblings).await,
                Check::Contains(schema) => contains_async(schema, value).await?,
                Check::Items => true,
            };
            if !passed {
                return Err(self.rejected(rule));
            }
        }
        Ok(())
    }

    fn item_failure(&self, index: usize, error: &ValidationError) -> Fault {
        Fault::reject(format!("[at index {}] {}", index, error.first_message()))
    }

    fn descend(&self, value: Value) -> Result<Option<Value>, Fault> {
        match &self.shape {
            Shape::Scalar => Ok(Some(value)),
            Shape::Array(items) => {
                let Value::Array(elements) = value else {
                    return Err(Fault::reject(NOT_AN_ARRAY));
                };
                let node = items.node();
                let mut validated = Vec::with_capacity(elements.len());
                for (index, element) in elements.into_iter().enumerate() {
                    match node.run(Some(element), &Record::new()) {
                        Ok(Some(item)) if !node.strips() => validated.push(item),
                        Ok(_) => {}
                        Err(Fault::Invalid(error)) => return Err(self.item_failure(index, &error)),
                        Err(misuse) => return Err(misuse),
                    }
                }
                Ok(Some(Value::Array(validated)))
            }
            Shape::Record(nested) => match nested.run(Some(value), &Record::new()) {
                Err(Fault::Invalid(error)) => Err(Fault::reject(error.collapse())),
                outcome => outcome,
            },
        }
    }

    async fn descend_async(&self, value: Value) -> Result<Option<Value>, Fault> {
        match &self.shape {
            Shape::Scalar => Ok(Some(value)),
            Shape::Array(items) => {
                let Value::Array(elements) = value else {
                    return Err(Fault::reject(NOT_AN_ARRAY));
                };
                let node = items.node();
                let mut validated = Vec::with_capacity(elements.len());
                for (index, element) in elements.into_iter().enumerate() {
                    match node.run_async(Some(element), &Record::new()).await {
                        Ok(Some(item)) if !node.strips() => validated.push(item),
                        Ok(_) => {}
                        Err(Fault::Invalid(error)) => return Err(self.item_failure(index, &error)),
                        Err(misuse) => return Err(misuse),
                    }
                }
                Ok(Some(Value::Array(validated)))
            }
            Shape::Record(nested) => match nested.run_async(Some(value), &Record::new()).await {
                Err(Fault::Invalid(error)) => Err(Fault::reject(error.collapse())),
                outcome => outcome,
            },
        }
    }
}

fn contains(schema: &SchemaRef, value: &Value) -> Result<bool, Fault> {
    let Some(elements) = value.as_array() else {
        return Ok(false);
    };
    for element in elements {
        match schema.node().run(Some(element.clone()), &Record::new()) {
            Ok(_) => return Ok(true),
            Err(Fault::Invalid(_)) => continue,
            Err(misuse) => return Err(misuse),
        }
    }
    Ok(false)
}

async fn contains_async(schema: &SchemaRef, value: &Value) -> Result<bool, Fault> {
    let Some(elements) = value.as_array() else {
        return Ok(false);
    };
    for element in elements {
        match schema.node().run_async(Some(element.clone()), &Record::new()).await {
            Ok(_) => return Ok(true),
            Err(Fault::Invalid(_)) => continue,
            Err(misuse) => return Err(misuse),
        }
    }
    Ok(false)
}

#[async_trait]
impl Node for FieldSchema {
    fn run(&self, value: Option<Value>, siblings: &Record) -> Result<Option<Value>, Fault> {
        let value = match self.gate(value)? {
            Gate::Settled(value) => return Ok(value),
            Gate::Present(value) => value,
        };
        self.check_rules(&value, siblings)?;
        self.descend(value)
    }

    async fn run_async(&self, value: Option<Value>, siblings: &Record) -> Result<Option<Value>, Fault> {
        let value = match self.gate(value)? {
            Gate::Settled(value) => return Ok(value),
            Gate::Present(value) => value,
        };
        self.check_rules_async(&value, siblings).await?;
        self.descend_async(value).await
    }

    fn requires_async(&self) -> bool {
        self.has_async
    }

    fn strips(&self) -> bool {
        self.flags.strip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{any, array, number, string};
    use serde_json::json;

    fn message(outcome: ValidationResult) -> String {
        outcome
            .unwrap()
            .error
            .map(|e| e.first_message().to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_optional_passthrough() {
        let schema = string();
        assert_eq!(schema.validate(None).unwrap().value, None);
        assert_eq!(schema.validate(Value::Null).unwrap().value, Some(Value::Null));
    }

    #[test]
    fn test_required_rejects_missing_and_null() {
        let schema = string().required();
        assert_eq!(message(schema.validate(None)), "is required");
        assert_eq!(message(schema.validate(Value::Null)), "is required");
    }

    #[test]
    fn test_nullable_keeps_null() {
        let schema = string().nullable().min(2);
        let outcome = schema.validate(Value::Null).unwrap();
        assert!(outcome.is_valid());
        assert_eq!(outcome.value, Some(Value::Null));
    }

    #[test]
    fn test_default_runs_before_presence_gate() {
        let schema = string().required().default("user");
        let outcome = schema.validate(None).unwrap();
        assert!(outcome.is_valid());
        assert_eq!(outcome.value, Some(json!("user")));
    }

    #[test]
    fn test_strip_accepts_invalid_input() {
        let schema = number().required().positive().strip();
        let outcome = schema.validate(json!(-5)).unwrap();
        assert!(outcome.is_valid());
        assert_eq!(outcome.value, None);
    }

    #[test]
    fn test_forbidden() {
        let schema = string().forbidden();
        assert_eq!(message(schema.validate(json!("a"))), "is forbidden");
        assert!(schema.validate(None).unwrap().is_valid());
    }

    #[test]
    fn test_first_declared_rule_wins() {
        let schema = number().greater(10).less(5);
        assert_eq!(message(schema.validate(json!(3))), "must be greater than 10");
        assert_eq!(message(schema.validate(json!(20))), "must be less than 5");
    }

    #[test]
    fn test_message_overrides_last_rule_only() {
        let schema = string().min(3).max(5).message("too long");
        assert_eq!(message(schema.validate(json!("ab"))), "must be at least 3");
        assert_eq!(message(schema.validate(json!("abcdef"))), "too long");
    }

    #[test]
    fn test_valid_and_invalid_messages() {
        let status = string().valid(["on", "off"]);
        assert!(status.validate(json!("on")).unwrap().is_valid());
        assert_eq!(message(status.validate(json!("pending"))), "must be one of [on, off]");

        let level = number().not_one_of([0]);
        assert_eq!(message(level.validate(json!(0))), "must not be one of [0]");
        assert!(level.validate(json!(1)).unwrap().is_valid());
    }

    #[test]
    fn test_min_max_branch_on_runtime_value() {
        let schema = number().min(3);
        assert!(schema.validate(json!(4)).unwrap().is_valid());
        assert!(!schema.validate(json!(2)).unwrap().is_valid());
        // Strings compare by length even on a number schema
        assert!(schema.validate(json!("abcd")).unwrap().is_valid());
        assert!(!schema.validate(json!("ab")).unwrap().is_valid());
    }

    #[test]
    fn test_length() {
        let pin = string().length(4).hex();
        assert!(pin.validate(json!("a1b2")).unwrap().is_valid());
        assert_eq!(message(pin.validate(json!("a1b"))), "length must be exactly 4");
        assert!(!pin.validate(json!(1234)).unwrap().is_valid());
    }

    #[test]
    fn test_transform_order() {
        let schema = string().trim().lowercase().min(3).token();
        let outcome = schema.validate(json!("  USER_123 ")).unwrap();
        assert_eq!(outcome.value, Some(json!("user_123")));

        let normalized = schema.validate(outcome.value.clone()).unwrap();
        assert_eq!(normalized.value, outcome.value);
    }

    #[test]
    fn test_custom_rule_and_custom_transform() {
        let even = number()
            .transform(|v| v.map(|v| json!(v.as_i64().unwrap_or_default() * 2)))
            .custom(|v, _| v.as_i64().map_or(false, |n| n % 4 == 0))
            .message("must double to a multiple of four");

        assert_eq!(even.validate(json!(2)).unwrap().value, Some(json!(4)));
        assert_eq!(message(even.validate(json!(3))), "must double to a multiple of four");
    }

    #[test]
    fn test_concat_preserves_order_and_async_flag() {
        let base = string().min(2);
        let extra = string().max(4).custom_async(|_, _| async { true });
        let merged = base.concat(&extra);

        let kinds: Vec<RuleKind> = merged.rules().iter().map(Rule::kind).collect();
        assert_eq!(kinds, vec![RuleKind::Min, RuleKind::Max, RuleKind::CustomAsync]);
        assert!(merged.requires_async());
    }

    #[test]
    fn test_concat_carries_item_schema() {
        let merged = array().concat(&array().items(string().alphanum()));
        assert_eq!(
            message(merged.validate(json!(["ok", "b!"]))),
            "[at index 1] must only contain alphanumeric characters."
        );
        assert!(merged.validate(json!(["ok", "b2"])).unwrap().is_valid());
    }

    #[test]
    fn test_concat_replaces_item_schema() {
        let merged = array().items(number().integer()).concat(&array().items(string().max(1)));
        let items = merged.rules().iter().filter(|r| r.kind() == RuleKind::Items).count();
        assert_eq!(items, 1);
        assert!(merged.validate(json!(["a"])).unwrap().is_valid());
        assert_eq!(message(merged.validate(json!(["a", "bc"]))), "[at index 1] must be at most 1");
    }

    #[test]
    fn test_concat_applies_transformers_then_rules_in_order() {
        let base = string().trim().min(3);
        let extra = string().uppercase().valid(["ABC"]);
        let merged = base.concat(&extra);

        assert_eq!(merged.validate(json!("  abc ")).unwrap().value, Some(json!("ABC")));
        assert_eq!(message(merged.validate(json!(" ab "))), "must be at least 3");
        assert_eq!(message(merged.validate(json!("abd"))), "must be one of [ABC]");
    }

    #[test]
    fn test_concat_keeps_has_rule() {
        let merged = array().unique().concat(&array().has(number().valid([7])));
        assert!(merged.validate(json!([1, 7])).unwrap().is_valid());
        assert_eq!(
            message(merged.validate(json!([1, 2]))),
            "must contain at least one required item"
        );
        assert_eq!(message(merged.validate(json!([7, 7]))), "must contain unique values");
    }

    #[test]
    fn test_items_called_twice_uses_last_schema() {
        let schema = array().items(number()).items(string().max(1));
        let items = schema.rules().iter().filter(|r| r.kind() == RuleKind::Items).count();
        assert_eq!(items, 1);
        assert!(schema.validate(json!(["a"])).unwrap().is_valid());
        assert_eq!(message(schema.validate(json!(["ab"]))), "[at index 0] must be at most 1");
    }

    #[test]
    fn test_membership_treats_equal_numbers_alike() {
        let one: Value = serde_json::from_str("1.0").unwrap();
        assert!(number().valid([1]).validate(one.clone()).unwrap().is_valid());
        assert!(!number().invalid([1]).validate(one).unwrap().is_valid());
        assert!(!string().valid([1]).validate(json!("1")).unwrap().is_valid());
    }

    #[test]
    fn test_meta_is_inert() {
        let schema = string().meta(json!({"label": "Name"})).meta(json!({"order": 1}));
        assert_eq!(schema.metadata().get("label"), Some(&json!("Name")));
        assert_eq!(schema.metadata().get("order"), Some(&json!(1)));
        assert!(schema.validate(json!("anything")).unwrap().is_valid());
    }

    #[test]
    fn test_items_index_message() {
        let tags = array().items(string().alphanum()).unique();
        assert_eq!(message(tags.validate(json!(["a", "b", "a"]))), "must contain unique values");
        assert_eq!(
            message(tags.validate(json!(["a", "b!"]))),
            "[at index 1] must only contain alphanumeric characters."
        );
        assert_eq!(message(tags.validate(json!("a"))), "must be an array");
    }

    #[test]
    fn test_items_failure_keeps_index_message() {
        let tags = array().items(string().max(2)).message("tags must be short");
        assert_eq!(message(tags.validate(json!(["ab", "abc"]))), "[at index 1] must be at most 2");
    }

    #[test]
    fn test_items_drop_stripped_elements() {
        let schema = array().items(string().strip());
        assert_eq!(schema.validate(json!(["a", "b"])).unwrap().value, Some(json!([])));
    }

    #[test]
    fn test_items_on_non_array_schema_is_ignored() {
        let schema = string().items(number());
        assert!(matches!(schema.shape(), Shape::Scalar));
        assert!(schema.validate(json!("x")).unwrap().is_valid());
    }

    #[test]
    fn test_single_then_items() {
        let schema = array().single().items(number().integer());
        assert_eq!(schema.validate(json!(5)).unwrap().value, Some(json!([5])));
    }

    #[test]
    fn test_has() {
        let schema = array().has(number().valid([1]));
        assert!(schema.validate(json!([3, 1])).unwrap().is_valid());
        assert_eq!(
            message(schema.validate(json!([2, 3]))),
            "must contain at least one required item"
        );
    }

    #[test]
    fn test_keys_collapses_nested_errors() {
        let user = any().keys([("name", string().required()), ("age", number().integer())]);
        // Nested records use default options, so only the first failure is kept
        assert_eq!(message(user.validate(json!({"age": 1.5}))), "age: must be an integer");
        assert_eq!(message(user.validate(json!({}))), "name: is required");
        assert_eq!(
            user.validate(json!({"name": "bob", "extra": 1})).unwrap().value,
            Some(json!({"name": "bob", "extra": 1}))
        );
        assert_eq!(message(user.validate(json!("bob"))), "must be an object");
    }

    #[test]
    fn test_standalone_failure_returns_original_input() {
        let schema = string().trim().min(5);
        let outcome = schema.validate(json!("  ab  ")).unwrap();
        assert_eq!(outcome.value, Some(json!("  ab  ")));
        let error = outcome.error.unwrap();
        assert_eq!(error.details.len(), 1);
        assert!(error.details[0].field.is_none());
    }

    #[test]
    fn test_sync_refuses_async_rules() {
        let schema = string().custom_async(|_, _| async { true });
        assert_eq!(schema.validate(json!("x")).unwrap_err(), SchemaError::AsyncRules);

        let nested = array().items(schema.clone());
        assert!(nested.requires_async());
        assert_eq!(nested.validate(json!(["x"])).unwrap_err(), SchemaError::AsyncRules);
    }

    #[tokio::test]
    async fn test_async_rule_outcomes() {
        let schema = string()
            .custom_async(|v, _| async move { v != json!("taken") })
            .message("is taken");

        assert!(schema.validate_async(json!("free")).await.unwrap().is_valid());
        let outcome = schema.validate_async(json!("taken")).await.unwrap();
        assert_eq!(outcome.error.unwrap().first_message(), "is taken");
    }

    #[tokio::test]
    async fn test_async_mode_runs_sync_rules_in_order() {
        let schema = number()
            .positive()
            .custom_async(|v, _| async move { v.as_i64() != Some(7) });

        let outcome = schema.validate_async(json!(-7)).await.unwrap();
        assert_eq!(outcome.error.unwrap().first_message(), "must be positive");

        let outcome = schema.validate_async(json!(7)).await.unwrap();
        assert_eq!(outcome.error.unwrap().first_message(), "failed async validation");
    }

    #[tokio::test]
    async fn test_concat_with_async_item_schema() {
        let merged = array().concat(&array().items(string().custom_async(|v, _| async move { v != json!("bad") })));
        assert!(merged.requires_async());

        let outcome = merged.validate_async(json!(["ok", "bad"])).await.unwrap();
        assert_eq!(outcome.error.unwrap().first_message(), "[at index 1] failed async validation");
    }

    #[tokio::test]
    async fn test_async_items() {
        let schema = array().items(string().custom_async(|v, _| async move { v.as_str() != Some("bad") }));

        let outcome = schema.validate_async(json!(["ok", "fine"])).await.unwrap();
        assert_eq!(outcome.value, Some(json!(["ok", "fine"])));

        let outcome = schema.validate_async(json!(["ok", "bad"])).await.unwrap();
        assert_eq!(outcome.error.unwrap().first_message(), "[at index 1] failed async validation");
    }
}
