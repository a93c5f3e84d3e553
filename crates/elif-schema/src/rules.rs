//! Rule records, cross-field limits and record-level relation rules

use crate::error::DetailKind;
use crate::traits::{AsyncPredicate, SchemaRef};
use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Synchronous predicate over `(value, sibling record)`
pub type SyncPredicate = Arc<dyn Fn(&Value, &Record) -> bool + Send + Sync>;

/// Kind tag of a field rule, kept for introspection and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    Forbidden,
    Valid,
    Invalid,
    Custom,
    CustomAsync,
    Pattern,
    Min,
    Max,
    Length,
    CreditCard,
    Ip,
    Ip4,
    Ip6,
    Email,
    Uuid,
    Hex,
    Token,
    IsoDate,
    Alphanum,
    Greater,
    Less,
    Integer,
    Positive,
    Negative,
    Port,
    Items,
    Unique,
    Has,
}

/// How a rule decides pass/fail
#[derive(Clone)]
pub enum Check {
    Sync(SyncPredicate),
    Async(Arc<dyn AsyncPredicate>),
    /// Passes when at least one array element satisfies the sub-schema
    Contains(SchemaRef),
    /// Marker for `items`; the item schema runs after the rule phase
    Items,
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Sync(_) => f.write_str("Sync"),
            Check::Async(_) => f.write_str("Async"),
            Check::Contains(schema) => f.debug_tuple("Contains").field(schema).finish(),
            Check::Items => f.write_str("Items"),
        }
    }
}

/// One atomic constraint with its failure message
#[derive(Debug, Clone)]
pub struct Rule {
    kind: RuleKind,
    check: Check,
    message: String,
    custom_message: Option<String>,
}

impl Rule {
    pub fn new(kind: RuleKind, check: Check, message: impl Into<String>) -> Self {
        Self {
            kind,
            check,
            message: message.into(),
            custom_message: None,
        }
    }

    /// Rule backed by a synchronous predicate
    pub fn predicate<F>(kind: RuleKind, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &Record) -> bool + Send + Sync + 'static,
    {
        Self::new(kind, Check::Sync(Arc::new(predicate)), message)
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn check(&self) -> &Check {
        &self.check
    }

    pub fn default_message(&self) -> &str {
        &self.message
    }

    pub fn custom_message(&self) -> Option<&str> {
        self.custom_message.as_deref()
    }

    /// Message reported on failure: the override if one was set
    pub fn message(&self) -> &str {
        self.custom_message.as_deref().unwrap_or(&self.message)
    }

    pub fn is_async(&self) -> bool {
        matches!(self.check, Check::Async(_))
    }

    pub(crate) fn set_custom_message(&mut self, message: String) {
        self.custom_message = Some(message);
    }
}

/// Bound used by `min`, `max`, `length`, `greater` and `less`.
///
/// Either a literal or a reference to a sibling field resolved at
/// evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Limit {
    Literal(f64),
    Field(String),
}

impl Limit {
    /// Resolve against the record being validated. Missing or non-numeric
    /// siblings resolve to `None`, which fails any comparison.
    pub fn resolve(&self, siblings: &Record) -> Option<f64> {
        match self {
            Limit::Literal(n) => Some(*n),
            Limit::Field(name) => siblings.get(name).and_then(Value::as_f64),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Literal(n) => write!(f, "{}", n),
            Limit::Field(name) => write!(f, "{{{}}}", name),
        }
    }
}

macro_rules! limit_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Limit {
                fn from(n: $ty) -> Self {
                    Limit::Literal(n as f64)
                }
            }
        )*
    };
}

limit_from_number!(i32, i64, u32, u64, usize, f32, f64);

/// Reference another field of the enclosing record as a limit
pub fn reference(name: impl Into<String>) -> Limit {
    Limit::Field(name.into())
}

/// `Some` and not JSON null
pub(crate) fn is_present(value: Option<&Value>) -> bool {
    matches!(value, Some(v) if !v.is_null())
}

/// Record-level relation between fields
#[derive(Debug, Clone)]
pub enum ObjectRule {
    /// At least one peer present
    Or(Vec<String>),
    /// All peers present if any is
    And(Vec<String>),
    /// Exactly one peer present
    Xor(Vec<String>),
    /// `key` present requires every peer
    With { key: String, peers: Vec<String> },
    /// `key` present forbids every peer
    Without { key: String, peers: Vec<String> },
    /// Value at a dotted path must satisfy a sub-schema
    Assert {
        path: String,
        schema: SchemaRef,
        message: Option<String>,
    },
}

impl ObjectRule {
    pub fn kind(&self) -> DetailKind {
        match self {
            ObjectRule::Or(_) => DetailKind::Or,
            ObjectRule::And(_) => DetailKind::And,
            ObjectRule::Xor(_) => DetailKind::Xor,
            ObjectRule::With { .. } => DetailKind::With,
            ObjectRule::Without { .. } => DetailKind::Without,
            ObjectRule::Assert { .. } => DetailKind::Assert,
        }
    }

    /// Field identifier used in error details: peers joined with `|`
    pub fn field_label(&self) -> String {
        match self {
            ObjectRule::Or(peers) | ObjectRule::And(peers) | ObjectRule::Xor(peers) => peers.join("|"),
            ObjectRule::With { peers, .. } | ObjectRule::Without { peers, .. } => peers.join("|"),
            ObjectRule::Assert { path, .. } => path.clone(),
        }
    }

    /// Failure message of a presence rule, `None` when satisfied.
    ///
    /// `Assert` needs a sub-schema run and always returns `None` here.
    pub(crate) fn presence_failure(&self, record: &Record) -> Option<String> {
        let present = |peers: &Vec<String>| count_present(record, peers);

        match self {
            ObjectRule::Or(peers) => (present(peers) == 0)
                .then(|| format!("At least one of [{}] is required.", peers.join(", "))),
            ObjectRule::And(peers) => {
                let count = present(peers);
                (count > 0 && count != peers.len())
                    .then(|| format!("All of [{}] are required when one is present.", peers.join(", ")))
            }
            ObjectRule::Xor(peers) => (present(peers) != 1)
                .then(|| format!("Exactly one of [{}] is required.", peers.join(", "))),
            ObjectRule::With { key, peers } => (is_present(record.get(key)) && present(peers) != peers.len())
                .then(|| format!("'{}' requires all of [{}].", key, peers.join(", "))),
            ObjectRule::Without { key, peers } => (is_present(record.get(key)) && present(peers) > 0)
                .then(|| format!("'{}' forbids any of [{}].", key, peers.join(", "))),
            ObjectRule::Assert { .. } => None,
        }
    }
}

fn count_present(record: &Record, peers: &[String]) -> usize {
    peers.iter().filter(|p| is_present(record.get(p.as_str()))).count()
}

/// Resolve a dotted path into a record. Object keys and array indices are
/// both accepted; any missing segment resolves to `None`.
pub(crate) fn resolve_path(record: &Record, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current.clone())
}
