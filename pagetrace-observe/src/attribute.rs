//! Attribute values recorded on scopes.

use opentelemetry::{Array, StringValue, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar or sequence-of-scalars attached to a scope.
///
/// Serialized untagged. An empty array carries no element type, so it
/// deserializes as an empty `StringArray` whatever variant produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    // Variant order decides untagged deserialization; string arrays first.
    StringArray(Vec<String>),
    BoolArray(Vec<bool>),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
}

impl AttributeValue {
    /// Returns the string slice if this is a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bool if this is a `Bool` value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the items if this is a `StringArray` value.
    pub fn as_string_array(&self) -> Option<&[String]> {
        match self {
            Self::StringArray(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&AttributeValue> for Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Int(i) => Value::I64(*i),
            AttributeValue::Float(f) => Value::F64(*f),
            AttributeValue::String(s) => Value::String(StringValue::from(s.clone())),
            AttributeValue::BoolArray(v) => Value::Array(Array::Bool(v.clone())),
            AttributeValue::IntArray(v) => Value::Array(Array::I64(v.clone())),
            AttributeValue::FloatArray(v) => Value::Array(Array::F64(v.clone())),
            AttributeValue::StringArray(v) => Value::Array(Array::String(
                v.iter().cloned().map(StringValue::from).collect(),
            )),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::BoolArray(v) => write!(f, "{v:?}"),
            Self::IntArray(v) => write!(f, "{v:?}"),
            Self::FloatArray(v) => write!(f, "{v:?}"),
            Self::StringArray(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for AttributeValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for AttributeValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<Vec<bool>> for AttributeValue {
    fn from(value: Vec<bool>) -> Self {
        Self::BoolArray(value)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(value: Vec<i64>) -> Self {
        Self::IntArray(value)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        Self::FloatArray(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringArray(value)
    }
}

impl From<&[String]> for AttributeValue {
    fn from(value: &[String]) -> Self {
        Self::StringArray(value.to_vec())
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(value: Vec<&str>) -> Self {
        Self::StringArray(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for AttributeValue {
    fn from(value: &[&str]) -> Self {
        Self::StringArray(value.iter().map(|s| s.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_slices_become_string_arrays() {
        let locales = vec!["en".to_string(), "fr".to_string()];
        let value = AttributeValue::from(locales.as_slice());
        assert_eq!(value.as_string_array(), Some(locales.as_slice()));
    }

    #[test]
    fn usize_saturates_into_int() {
        assert_eq!(AttributeValue::from(3usize), AttributeValue::Int(3));
    }

    #[test]
    fn converts_to_opentelemetry_values() {
        let value = Value::from(&AttributeValue::from(vec!["a", "b"]));
        assert_eq!(
            value,
            Value::Array(Array::String(vec![
                StringValue::from("a"),
                StringValue::from("b")
            ]))
        );
        assert_eq!(Value::from(&AttributeValue::Bool(true)), Value::Bool(true));
    }

    #[test]
    fn serializes_untagged() {
        assert_eq!(
            serde_json::to_string(&AttributeValue::from("home")).unwrap(),
            r#""home""#
        );
        assert_eq!(
            serde_json::to_string(&AttributeValue::from(vec!["en", "fr"])).unwrap(),
            r#"["en","fr"]"#
        );
        let parsed: AttributeValue = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, AttributeValue::Int(42));
    }

    #[test]
    fn arrays_deserialize_to_their_element_type() {
        let parse = |json: &str| serde_json::from_str::<AttributeValue>(json).unwrap();

        assert_eq!(parse("[]"), AttributeValue::StringArray(Vec::new()));
        assert_eq!(parse(r#"["fr"]"#), AttributeValue::from(vec!["fr"]));
        assert_eq!(parse("[true]"), AttributeValue::BoolArray(vec![true]));
        assert_eq!(parse("[1, 2]"), AttributeValue::IntArray(vec![1, 2]));
        assert_eq!(parse("[0.5]"), AttributeValue::FloatArray(vec![0.5]));
    }

    #[test]
    fn empty_locales_survive_json_round_trip() {
        let empty: &[String] = &[];
        let value = AttributeValue::from(empty);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(serde_json::from_str::<AttributeValue>(&json).unwrap(), value);
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(AttributeValue::from("dry_run").to_string(), "dry_run");
        assert_eq!(
            AttributeValue::from(vec!["fr"]).to_string(),
            r#"["fr"]"#
        );
    }
}
