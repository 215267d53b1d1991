//! Attribute value type read from indexed objects.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An attribute value as exposed by an [`Indexable`](super::Indexable) object.
///
/// Covers what an object store typically hands back for a column:
/// - Scalars: Bool, Int, Float, String
/// - Containers: List, Map (maps are what nested column paths walk into)
/// - Temporal: Date, DateTime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

// ============================================================================
// Emptiness + traversal
// ============================================================================

impl Value {
    /// Empty values never produce an index row.
    ///
    /// `Null`, `""`, `[]` and `{}` are empty. Zero and `false` are real
    /// values and do get indexed.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Nested lookup used for every column path segment after the first.
    ///
    /// Only maps have children; every other variant yields `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(key),
            _ => None,
        }
    }
}

// ============================================================================
// Index serialization
// ============================================================================

impl Value {
    /// The string stored in the `value` column of an index row.
    ///
    /// Returns `None` for empty values. Containers serialize as JSON with
    /// sorted map keys so equal maps always produce the same string.
    /// Floats always keep a decimal point (`30.0`), so `Float(30.0)` and
    /// `Int(30)` index differently; the string `"30"` matches `Int(30)`.
    pub fn to_index_string(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let s = match self {
            Value::Null => return None,
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{f:?}"),
            Value::String(s) => s.clone(),
            Value::Date(d) => d.to_string(),
            Value::DateTime(dt) => dt.to_rfc3339(),
            Value::List(_) | Value::Map(_) => self.to_json().to_string(),
        };
        Some(s)
    }

    /// Plain JSON rendering (no type tags).
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::List(l) => Json::Array(l.iter().map(Value::to_json).collect()),
            Value::Map(m) => Json::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Date(d) => Json::String(d.to_string()),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<NaiveDate> for Value { fn from(v: NaiveDate) -> Self { Value::Date(v) } }
impl From<DateTime<Utc>> for Value { fn from(v: DateTime<Utc>) -> Self { Value::DateTime(v) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match v {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            Json::String(s) => Value::String(s),
            Json::Array(a) => Value::List(a.into_iter().map(Value::from).collect()),
            Json::Object(o) => Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_emptiness() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(Value::Map(HashMap::new()).is_empty());
        assert!(!Value::Int(0).is_empty());
        assert!(!Value::Bool(false).is_empty());
    }

    #[test]
    fn test_index_string() {
        assert_eq!(Value::from("NYC").to_index_string().as_deref(), Some("NYC"));
        assert_eq!(Value::Int(30).to_index_string().as_deref(), Some("30"));
        assert_eq!(Value::Float(1.5).to_index_string().as_deref(), Some("1.5"));
        assert_eq!(Value::Float(30.0).to_index_string().as_deref(), Some("30.0"));
        assert_ne!(Value::Float(30.0).to_index_string(), Value::Int(30).to_index_string());
        assert_eq!(Value::Bool(false).to_index_string().as_deref(), Some("false"));
        assert_eq!(Value::Null.to_index_string(), None);
        assert_eq!(Value::from("").to_index_string(), None);
    }

    #[test]
    fn test_map_index_string_is_stable() {
        let a = Value::from(serde_json::json!({"b": 1, "a": [true, "x"]}));
        let b = Value::from(serde_json::json!({"a": [true, "x"], "b": 1}));
        assert_eq!(a.to_index_string(), b.to_index_string());
        assert_eq!(a.to_index_string().as_deref(), Some(r#"{"a":[true,"x"],"b":1}"#));
    }

    #[test]
    fn test_nested_get() {
        let v = Value::from(serde_json::json!({"address": {"city": "NYC"}}));
        let city = v.get("address").and_then(|a| a.get("city"));
        assert_eq!(city, Some(&Value::from("NYC")));
        assert_eq!(Value::from("flat").get("city"), None);
    }
}
