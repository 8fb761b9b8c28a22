//! Firestore REST value encoding.
//!
//! Firestore wraps every value in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "12"}`, ...). Server timestamps
//! are not values at all: they travel as field transforms next to the write,
//! so [`split_server_timestamps`] pulls them out of a payload first.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, json};

use crate::db::{Document, DocumentPath, Fields, RepositoryError, Value};

/// A document as returned by the REST API.
#[derive(Debug, Deserialize)]
pub struct RawDocument {
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, serde_json::Value>,
}

/// Encode one value. Server timestamps must have been split out already and
/// encode as null.
#[must_use]
pub fn encode_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null | Value::ServerTimestamp => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Integer(i) => json!({ "integerValue": i.to_string() }),
        Value::Double(d) => json!({ "doubleValue": d }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Timestamp(ts) => {
            json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::Micros, true) })
        }
        Value::Array(values) => {
            let values: Vec<_> = values.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Encode a field map.
#[must_use]
pub fn encode_fields(fields: &Fields) -> Map<String, serde_json::Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Decode one typed value.
///
/// # Errors
///
/// Returns `RepositoryError::Decode` on an unknown or malformed type tag.
pub fn decode_value(value: &serde_json::Value) -> Result<Value, RepositoryError> {
    let object = value
        .as_object()
        .ok_or_else(|| RepositoryError::Decode(format!("expected a typed value, got {value}")))?;
    let (tag, inner) = object
        .iter()
        .next()
        .ok_or_else(|| RepositoryError::Decode("empty typed value".to_owned()))?;

    let decoded = match tag.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
        "integerValue" => Value::Integer(parse_integer(inner)?),
        "doubleValue" => inner.as_f64().map_or(Value::Null, Value::Double),
        "timestampValue" => Value::Timestamp(parse_timestamp(inner)?),
        "stringValue" | "referenceValue" | "bytesValue" => {
            Value::String(inner.as_str().unwrap_or_default().to_owned())
        }
        "geoPointValue" => {
            let mut point = Fields::new();
            for key in ["latitude", "longitude"] {
                if let Some(coordinate) = inner.get(key).and_then(serde_json::Value::as_f64) {
                    point.insert(key.to_owned(), Value::Double(coordinate));
                }
            }
            Value::Map(point)
        }
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(serde_json::Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .transpose()?
                .unwrap_or_default();
            Value::Array(values)
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(serde_json::Value::as_object)
                .map(decode_fields)
                .transpose()?
                .unwrap_or_default();
            Value::Map(fields)
        }
        other => {
            return Err(RepositoryError::Decode(format!("unknown value type {other}")));
        }
    };
    Ok(decoded)
}

/// Decode a field map.
///
/// # Errors
///
/// Returns `RepositoryError::Decode` if any value is malformed.
pub fn decode_fields(fields: &Map<String, serde_json::Value>) -> Result<Fields, RepositoryError> {
    fields
        .iter()
        .map(|(k, v)| decode_value(v).map(|v| (k.clone(), v)))
        .collect()
}

/// Decode a REST document, turning its resource name back into a path.
///
/// # Errors
///
/// Returns `RepositoryError::Decode` if the name is not a document resource
/// name or a field is malformed.
pub fn decode_document(raw: &RawDocument) -> Result<Document, RepositoryError> {
    let (_, relative) = raw
        .name
        .split_once("/documents/")
        .ok_or_else(|| RepositoryError::Decode(format!("unexpected name {}", raw.name)))?;
    Ok(Document {
        path: DocumentPath::parse(relative)?,
        fields: decode_fields(&raw.fields)?,
    })
}

fn parse_integer(inner: &serde_json::Value) -> Result<i64, RepositoryError> {
    match inner {
        serde_json::Value::String(s) => s
            .parse()
            .map_err(|e| RepositoryError::Decode(format!("integerValue {s}: {e}"))),
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| RepositoryError::Decode(format!("integerValue {n}"))),
        other => Err(RepositoryError::Decode(format!("integerValue {other}"))),
    }
}

fn parse_timestamp(inner: &serde_json::Value) -> Result<DateTime<Utc>, RepositoryError> {
    let text = inner
        .as_str()
        .ok_or_else(|| RepositoryError::Decode(format!("timestampValue {inner}")))?;
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("timestampValue {text}: {e}")))
}

/// Quote a field name for use in a field path when it is not a simple
/// identifier.
#[must_use]
pub fn quote_field(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_owned()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Remove every server timestamp from `fields`, returning the remaining
/// fields and the field paths that must be set to the request time.
///
/// Maps left empty by the removal are dropped as well.
#[must_use]
pub fn split_server_timestamps(fields: Fields) -> (Fields, Vec<String>) {
    let mut transforms = Vec::new();
    let remaining = split_inner(fields, "", &mut transforms);
    (remaining, transforms)
}

fn split_inner(fields: Fields, prefix: &str, transforms: &mut Vec<String>) -> Fields {
    let mut remaining = Fields::new();
    for (key, value) in fields {
        let path = if prefix.is_empty() {
            quote_field(&key)
        } else {
            format!("{prefix}.{}", quote_field(&key))
        };
        match value {
            Value::ServerTimestamp => transforms.push(path),
            Value::Map(inner) => {
                let had_fields = !inner.is_empty();
                let inner = split_inner(inner, &path, transforms);
                if !had_fields || !inner.is_empty() {
                    remaining.insert(key, Value::Map(inner));
                }
            }
            other => {
                remaining.insert(key, other);
            }
        }
    }
    remaining
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_encode_scalar_values() {
        assert_eq!(encode_value(&Value::Integer(15)), json!({"integerValue": "15"}));
        assert_eq!(encode_value(&Value::from("PS5")), json!({"stringValue": "PS5"}));
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            encode_value(&Value::Timestamp(ts)),
            json!({"timestampValue": "2025-01-02T03:04:05.000000Z"})
        );
    }

    #[test]
    fn test_decode_nested_document() {
        let raw: RawDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/games/PS4 & PS5/juegos/a_way_out",
            "fields": {
                "nombre": {"stringValue": "A Way Out"},
                "costo": {"integerValue": "12"},
                "activo": {"booleanValue": true},
                "precios": {"mapValue": {"fields": {"ps4Principal": {"doubleValue": 12.5}}}},
                "correos": {"arrayValue": {}},
                "createdAt": {"timestampValue": "2025-01-02T03:04:05.123456Z"}
            }
        }))
        .unwrap();

        let doc = decode_document(&raw).unwrap();
        assert_eq!(doc.id(), "a_way_out");
        assert_eq!(doc.path.parent().name(), "juegos");
        assert_eq!(doc.fields["costo"], Value::Integer(12));
        assert_eq!(doc.fields["correos"], Value::Array(vec![]));
        let Value::Map(precios) = &doc.fields["precios"] else {
            panic!("precios should be a map");
        };
        assert_eq!(precios["ps4Principal"], Value::Double(12.5));
        assert!(doc.fields["createdAt"].as_timestamp().is_some());
    }

    #[test]
    fn test_unknown_type_is_a_decode_error() {
        let err = decode_value(&json!({"vectorValue": {}})).unwrap_err();
        assert!(matches!(err, RepositoryError::Decode(_)));
    }

    #[test]
    fn test_split_server_timestamps() {
        let mut nested = Fields::new();
        nested.insert("at".into(), Value::ServerTimestamp);

        let mut fields = Fields::new();
        fields.insert("createdAt".into(), Value::ServerTimestamp);
        fields.insert("nombre".into(), Value::from("x"));
        fields.insert("audit".into(), Value::Map(nested));
        fields.insert("empty".into(), Value::Map(Fields::new()));

        let (remaining, transforms) = split_server_timestamps(fields);
        assert_eq!(transforms, vec!["audit.at".to_owned(), "createdAt".to_owned()]);
        assert!(remaining.contains_key("nombre"));
        assert!(remaining.contains_key("empty"));
        assert!(!remaining.contains_key("audit"));
        assert!(!remaining.contains_key("createdAt"));
    }

    #[test]
    fn test_quote_field() {
        assert_eq!(quote_field("ps4PrincipalCOP"), "ps4PrincipalCOP");
        assert_eq!(quote_field("a@b.com"), "`a@b.com`");
        assert_eq!(quote_field("9lives"), "`9lives`");
    }
}
