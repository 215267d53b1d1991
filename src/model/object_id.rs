//! Identifiers into the external object store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque object identifier.
///
/// Stores key their objects either by integer or by string; both are
/// carried as-is and never coerced into one another, so `Int(1)` and
/// `Str("1")` are different objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectId {
    Int(u64),
    Str(String),
}

impl ObjectId {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            ObjectId::Int(i) => Some(*i),
            ObjectId::Str(_) => None,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectId::Int(i) => write!(f, "{i}"),
            ObjectId::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for ObjectId { fn from(v: u64) -> Self { ObjectId::Int(v) } }
impl From<u32> for ObjectId { fn from(v: u32) -> Self { ObjectId::Int(v as u64) } }
impl From<String> for ObjectId { fn from(v: String) -> Self { ObjectId::Str(v) } }
impl From<&str> for ObjectId { fn from(v: &str) -> Self { ObjectId::Str(v.to_owned()) } }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_and_str_are_distinct() {
        assert_ne!(ObjectId::from(1u64), ObjectId::from("1"));
        assert_eq!(ObjectId::from(1u64).to_string(), ObjectId::from("1").to_string());
    }

    #[test]
    fn test_untagged_serde() {
        let ids: Vec<ObjectId> = serde_json::from_str(r#"[7, "abc"]"#).unwrap();
        assert_eq!(ids, vec![ObjectId::Int(7), ObjectId::Str("abc".into())]);
        assert_eq!(serde_json::to_string(&ids).unwrap(), r#"[7,"abc"]"#);
    }
}
