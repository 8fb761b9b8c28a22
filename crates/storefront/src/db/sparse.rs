//! Sparse partial updates.
//!
//! The document store must never receive explicit nulls or empty strings for
//! optional fields: either would overwrite a value another client set. Every
//! write payload passes through [`sparse`] before it reaches a
//! [`DocumentStore`](super::DocumentStore).

use super::value::{Fields, Value};

/// Recursively drop nulls and empty strings from maps and arrays.
///
/// Empty maps and arrays are kept: an empty `codigosGenerados` is a real
/// value meaning "no codes left".
#[must_use]
pub fn sparse(fields: Fields) -> Fields {
    fields
        .into_iter()
        .filter_map(|(key, value)| prune(value).map(|value| (key, value)))
        .collect()
}

fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(values) => Some(Value::Array(values.into_iter().filter_map(prune).collect())),
        Value::Map(fields) => Some(Value::Map(sparse(fields))),
        other => Some(other),
    }
}
