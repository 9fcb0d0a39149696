//! Keyword lookups and their resolution into store conditions.
//!
//! Keys follow the `field` / `field__op` convention. `pk` aliases `id`.
//! An opaque identifier is attached with [`Lookup::hash`] and resolved
//! before any field predicate.

use super::{QueryError, QueryResult};
use crate::codec::IdCodec;
use crate::db::schema::has_column;
use crate::model::record::{Entity, DELETION_FIELD};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;

static LOOKUP_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*?)(?:__([a-z]+))?$").expect("valid lookup key regex")
});

const PK_ALIAS: &str = "pk";
const ID_FIELD: &str = "id";

/// Comparison applied by a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOp {
    Exact,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    IsNull,
    Contains,
    StartsWith,
}

impl LookupOp {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "exact" => Some(Self::Exact),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            "isnull" => Some(Self::IsNull),
            "contains" => Some(Self::Contains),
            "startswith" => Some(Self::StartsWith),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::IsNull => "isnull",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
        }
    }
}

/// Value accepted by lookup builders.
///
/// Wraps a store value so call sites can pass plain Rust literals.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue(pub Value);

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self(Value::Integer(i64::from(value)))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self(Value::Integer(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self(Value::Integer(i64::from(value)))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self(Value::Real(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self(Value::Text(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self(Value::Text(value))
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self(Value::Null), Into::into)
    }
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Single(Value),
    List(Vec<Value>),
}

/// One resolved `field <op> operand` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: LookupOp,
    pub operand: Operand,
}

impl Predicate {
    /// Parses a lookup key and checks operand shape.
    ///
    /// Field existence is checked separately against the entity.
    pub fn parse(key: &str, operand: Operand) -> QueryResult<Self> {
        let captures = LOOKUP_KEY_RE
            .captures(key)
            .ok_or_else(|| QueryError::InvalidLookup(format!("malformed lookup key `{key}`")))?;
        let field = match captures.get(1).map(|m| m.as_str()) {
            Some(PK_ALIAS) => ID_FIELD.to_string(),
            Some(name) => name.to_string(),
            None => {
                return Err(QueryError::InvalidLookup(format!(
                    "malformed lookup key `{key}`"
                )))
            }
        };
        let op = match captures.get(2) {
            Some(raw) => LookupOp::parse(raw.as_str()).ok_or_else(|| {
                QueryError::InvalidLookup(format!(
                    "unsupported lookup operator `{}` in `{key}`",
                    raw.as_str()
                ))
            })?,
            None => LookupOp::Exact,
        };

        match (op, &operand) {
            (LookupOp::In, Operand::List(_)) => {}
            (LookupOp::In, Operand::Single(_)) => {
                return Err(QueryError::InvalidLookup(format!(
                    "`{key}` expects a list of values"
                )))
            }
            (_, Operand::List(_)) => {
                return Err(QueryError::InvalidLookup(format!(
                    "`{key}` expects a single value"
                )))
            }
            (LookupOp::Contains | LookupOp::StartsWith, Operand::Single(Value::Text(_))) => {}
            (LookupOp::Contains | LookupOp::StartsWith, Operand::Single(_)) => {
                return Err(QueryError::InvalidLookup(format!(
                    "`{key}` expects a text value"
                )))
            }
            (LookupOp::IsNull, Operand::Single(Value::Integer(0 | 1))) => {}
            (LookupOp::IsNull, Operand::Single(_)) => {
                return Err(QueryError::InvalidLookup(format!(
                    "`{key}` expects a boolean value"
                )))
            }
            _ => {}
        }

        Ok(Self { field, op, operand })
    }

    fn primary_key(id: i64) -> Self {
        Self {
            field: ID_FIELD.to_string(),
            op: LookupOp::Exact,
            operand: Operand::Single(Value::Integer(id)),
        }
    }
}

/// A resolved store condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Field(Predicate),
    /// Matches no row; stands in for an opaque id that did not decode.
    MatchNone,
}

impl Condition {
    pub(crate) fn names_field(&self, field: &str) -> bool {
        match self {
            Self::Field(predicate) => predicate.field == field,
            Self::MatchNone => false,
        }
    }

    pub(crate) fn names_deletion_state(&self) -> bool {
        self.names_field(DELETION_FIELD)
    }
}

/// Keyword arguments for `get` / `filter` / `exclude`.
///
/// ```
/// use softkeep_core::Lookup;
///
/// let lookup = Lookup::new()
///     .field("title__contains", "draft")
///     .field("is_deleted", true);
/// assert!(!lookup.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lookup {
    entries: Vec<(String, Operand)>,
    token: Option<String>,
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup matching a single opaque identifier.
    pub fn by_hash(token: impl Into<String>) -> Self {
        Self::new().hash(token)
    }

    /// Lookup matching a single primary key.
    pub fn by_pk(id: i64) -> Self {
        Self::new().field(PK_ALIAS, id)
    }

    /// Adds a single-valued keyword argument such as `title` or `id__gte`.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let FieldValue(value) = value.into();
        self.entries.push((key.into(), Operand::Single(value)));
        self
    }

    /// Adds a list-valued keyword argument (`field__in`).
    pub fn field_in<V>(mut self, key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<FieldValue>,
    {
        let values = values.into_iter().map(|value| value.into().0).collect();
        self.entries.push((key.into(), Operand::List(values)));
        self
    }

    /// Sets the opaque identifier argument.
    pub fn hash(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.token.is_none()
    }

    /// Resolves this lookup for entity `E`.
    ///
    /// The opaque identifier, if any, is decoded first and becomes either a
    /// primary-key predicate or [`Condition::MatchNone`].
    ///
    /// # Errors
    /// - `InvalidLookup` for malformed keys, unknown fields or operand
    ///   shape mismatches.
    pub fn resolve<E: Entity>(&self, codec: &IdCodec) -> QueryResult<Vec<Condition>> {
        let mut conditions = Vec::with_capacity(self.entries.len() + 1);

        if let Some(token) = self.token.as_deref() {
            match codec.try_decode(token) {
                Ok(id) => conditions.push(Condition::Field(Predicate::primary_key(id))),
                Err(reason) => {
                    debug!(
                        "event=token_decode module=query status=rejected table={} reason={}",
                        E::TABLE,
                        reason.code()
                    );
                    conditions.push(Condition::MatchNone);
                }
            }
        }

        for (key, operand) in &self.entries {
            let predicate = Predicate::parse(key, operand.clone())?;
            if !has_column::<E>(&predicate.field) {
                return Err(QueryError::InvalidLookup(format!(
                    "unknown field `{}` on `{}`",
                    predicate.field,
                    E::TABLE
                )));
            }
            conditions.push(Condition::Field(predicate));
        }

        Ok(conditions)
    }
}
