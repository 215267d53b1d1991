//! Column paths: which attribute of an object an index covers.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{Error, Result};

/// A registered column, possibly pointing into nested attributes.
///
/// `address__city` with separator `__` reads attribute `address` from the
/// object and then looks up `city` inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawColumnPath")]
pub struct ColumnPath {
    raw: String,
    segments: SmallVec<[String; 2]>,
}

/// Unchecked wire form; deserialization goes through [`TryFrom`].
#[derive(Deserialize)]
struct RawColumnPath {
    raw: String,
    segments: SmallVec<[String; 2]>,
}

impl TryFrom<RawColumnPath> for ColumnPath {
    type Error = Error;

    fn try_from(path: RawColumnPath) -> Result<Self> {
        if path.raw.is_empty() || path.segments.is_empty() {
            return Err(Error::Usage("column path must have at least one segment".into()));
        }
        if path.segments.iter().any(String::is_empty) {
            return Err(Error::Usage(format!("column '{}' has an empty path segment", path.raw)));
        }
        Ok(Self { raw: path.raw, segments: path.segments })
    }
}

impl ColumnPath {
    /// Parse and validate a column name.
    ///
    /// Rejects empty names, names longer than `max_len` bytes, and paths
    /// with an empty segment (`a____b`, `__a`).
    pub fn parse(raw: &str, separator: &str, max_len: usize) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::Usage("column name must not be empty".into()));
        }
        if raw.len() > max_len {
            return Err(Error::Usage(format!(
                "column '{raw}' is {} bytes, limit is {max_len}",
                raw.len()
            )));
        }
        let segments: SmallVec<[String; 2]> = if separator.is_empty() {
            smallvec::smallvec![raw.to_owned()]
        } else {
            raw.split(separator).map(str::to_owned).collect()
        };
        if segments.iter().any(String::is_empty) {
            return Err(Error::Usage(format!(
                "column '{raw}' has an empty path segment (separator '{separator}')"
            )));
        }
        Ok(Self { raw: raw.to_owned(), segments })
    }

    pub fn as_str(&self) -> &str { &self.raw }

    /// First segment: the attribute read directly off the object.
    pub fn head(&self) -> &str { &self.segments[0] }

    /// Remaining segments, walked through [`Value::get`](super::Value::get).
    pub fn tail(&self) -> &[String] { &self.segments[1..] }

    pub fn is_nested(&self) -> bool { self.segments.len() > 1 }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Validate a type key (the namespace of an indexed object type).
pub fn validate_type_key(type_key: &str) -> Result<()> {
    if type_key.is_empty() {
        return Err(Error::Usage("type key must not be empty".into()));
    }
    Ok(())
}
