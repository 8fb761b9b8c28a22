//! Document field values.
//!
//! [`Value`] mirrors the value types of the remote document store. Models are
//! converted to and from [`Fields`] through `serde_json`, so every struct that
//! derives `Serialize`/`Deserialize` can be written and read without a
//! hand-written mapping.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::RepositoryError;

/// Top-level fields of a document, ordered by name.
pub type Fields = BTreeMap<String, Value>;

/// Largest integer a double can hold exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    /// Placeholder replaced by the commit time when the write is applied.
    ServerTimestamp,
    Array(Vec<Self>),
    Map(Fields),
}

impl Value {
    /// Borrow the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Ordering used by `order by` queries.
    ///
    /// Values of different types order by type rank (null, bool, number,
    /// timestamp, string, array, map); numbers compare across integer and
    /// double.
    #[must_use]
    pub fn order(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(_) | Self::Double(_), Self::Integer(_) | Self::Double(_)) => self
                .as_f64()
                .partial_cmp(&other.as_f64())
                .unwrap_or(Ordering::Equal),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(i) => *i as f64,
            Self::Double(d) => *d,
            _ => 0.0,
        }
    }

    const fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) | Self::Double(_) => 2,
            Self::Timestamp(_) | Self::ServerTimestamp => 3,
            Self::String(_) => 4,
            Self::Array(_) => 5,
            Self::Map(_) => 6,
        }
    }

    /// Convert to JSON for model decoding.
    ///
    /// Timestamps become RFC 3339 strings, which `chrono` deserializes
    /// directly. An unresolved server timestamp reads as `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null | Self::ServerTimestamp => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Double(d) => serde_json::Number::from_f64(*d)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Timestamp(ts) => {
                serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::Array(values) => values.iter().map(Self::to_json).collect(),
            Self::Map(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Convert from JSON produced by serializing a model.
    ///
    /// Whole doubles within the safe integer range are stored as integers,
    /// matching how the web client writes numbers.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_i64().map_or_else(
                || {
                    let d = n.as_f64().unwrap_or_default();
                    whole_number(d).map_or(Self::Double(d), Self::Integer)
                },
                Self::Integer,
            ),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(values) => {
                Self::Array(values.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Serialize any model into a value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Decode` if the model fails to serialize.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self, RepositoryError> {
        serde_json::to_value(value)
            .map(Self::from_json)
            .map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn whole_number(d: f64) -> Option<i64> {
    (d.fract() == 0.0 && d.abs() <= MAX_SAFE_INTEGER).then_some(d as i64)
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        if d.fract().is_zero()
            && let Some(i) = d.to_i64()
        {
            return Self::Integer(i);
        }
        Self::Double(d.to_f64().unwrap_or_default())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<Vec<Self>> for Value {
    fn from(values: Vec<Self>) -> Self {
        Self::Array(values)
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Self::Map(fields)
    }
}

/// Serialize a model into top-level fields.
///
/// # Errors
///
/// Returns `RepositoryError::Decode` if the model does not serialize to an
/// object.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Fields, RepositoryError> {
    match Value::from_serializable(value)? {
        Value::Map(fields) => Ok(fields),
        other => Err(RepositoryError::Decode(format!(
            "expected an object, got {other:?}"
        ))),
    }
}

/// Deserialize top-level fields into a model.
///
/// # Errors
///
/// Returns `RepositoryError::Decode` if the fields do not match the model.
pub fn decode<T: DeserializeOwned>(fields: &Fields) -> Result<T, RepositoryError> {
    let object = fields
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect::<serde_json::Map<_, _>>();
    serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| RepositoryError::Decode(e.to_string()))
}
