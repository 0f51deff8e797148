//! Property values stored on graph nodes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Property map of a node. Ordered so rendered queries are deterministic.
pub type Properties = BTreeMap<String, Value>;

/// The declared type of a schema property.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::String => write!(f, "string"),
            PropertyType::Number => write!(f, "number"),
            PropertyType::Boolean => write!(f, "boolean"),
        }
    }
}

/// A scalar property value.
///
/// Integers and floats are both of type [`PropertyType::Number`]; they are
/// kept apart so integer properties round-trip through Bolt as integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn property_type(&self) -> PropertyType {
        match self {
            Value::Boolean(_) => PropertyType::Boolean,
            Value::Integer(_) | Value::Float(_) => PropertyType::Number,
            Value::String(_) => PropertyType::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

/// Build a [`Properties`] map from `(name, value)` pairs.
///
/// ```
/// # use nodeweave_core::value::{props, Value};
/// let p = props([("name", Value::from("Barry")), ("age", Value::from(36))]);
/// assert_eq!(p["age"], Value::Integer(36));
/// ```
pub fn props<K, I>(pairs: I) -> Properties
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Convert a property map into a typed struct through its serde representation.
pub fn from_properties<T: serde::de::DeserializeOwned>(
    properties: &Properties,
) -> Result<T, serde_json::Error> {
    let json = serde_json::to_value(properties)?;
    serde_json::from_value(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Movie {
        name: String,
        year: i64,
    }

    #[test]
    fn number_variants_share_a_type() {
        assert_eq!(Value::from(36).property_type(), PropertyType::Number);
        assert_eq!(Value::from(36.5).property_type(), PropertyType::Number);
        assert_eq!(Value::from("x").property_type(), PropertyType::String);
        assert_eq!(Value::from(true).property_type(), PropertyType::Boolean);
    }

    #[test]
    fn integers_widen_to_float() {
        assert_eq!(Value::Integer(21).as_f64(), Some(21.0));
        assert_eq!(Value::from("21").as_f64(), None);
    }

    #[test]
    fn json_is_untagged() {
        let json = serde_json::to_string(&Value::from(2010)).unwrap();
        assert_eq!(json, "2010");

        let parsed: Value = serde_json::from_str("31.5").unwrap();
        assert_eq!(parsed, Value::Float(31.5));
        let parsed: Value = serde_json::from_str("31").unwrap();
        assert_eq!(parsed, Value::Integer(31));
    }

    #[test]
    fn properties_into_typed_struct() {
        let p = props([
            ("name", Value::from("Inception")),
            ("year", Value::from(2010)),
        ]);
        let movie: Movie = from_properties(&p).unwrap();
        assert_eq!(
            movie,
            Movie {
                name: "Inception".to_string(),
                year: 2010
            }
        );
    }
}
