//! Engine configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{ColumnPath, Value, validate_type_key};
use crate::{Error, Result};

/// Which cache entries a write clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationPolicy {
    /// Clear the entry for the value that was written and the entry for the
    /// value it replaced (or removed).
    #[default]
    OldAndNew,
    /// Clear only the entry for the value that was written. Entries for a
    /// replaced value, and entries touched by deletes, stay until evicted,
    /// so lookups on an old value can keep returning the object.
    NewValueOnly,
}

/// Tuning knobs for an [`Indexer`](crate::Indexer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Separator between nested attribute names in a column path.
    pub column_separator: String,
    /// Longest serialized value, in bytes, an index row may hold.
    pub max_value_len: usize,
    /// Longest column name, in bytes.
    pub max_column_len: usize,
    /// Cache empty candidate lists as well as non-empty ones.
    pub cache_negative_results: bool,
    pub invalidation: InvalidationPolicy,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            column_separator: "__".into(),
            max_value_len: 128,
            max_column_len: 32,
            cache_negative_results: true,
            invalidation: InvalidationPolicy::OldAndNew,
        }
    }
}

impl IndexerConfig {
    pub fn parse_column(&self, column: &str) -> Result<ColumnPath> {
        ColumnPath::parse(column, &self.column_separator, self.max_column_len)
    }

    /// Serialize a value for storage, enforcing the length bound.
    ///
    /// `Ok(None)` means the value is empty and must not be indexed.
    pub fn index_value(&self, type_key: &str, column: &str, value: &Value) -> Result<Option<String>> {
        validate_type_key(type_key)?;
        match value.to_index_string() {
            Some(s) if s.len() > self.max_value_len => {
                warn!(type_key, column, len = s.len(), limit = self.max_value_len, "value rejected");
                Err(Error::Usage(format!(
                    "value for {type_key}.{column} is {} bytes, limit is {}",
                    s.len(),
                    self.max_value_len
                )))
            }
            other => Ok(other),
        }
    }
}

/// Where index rows live.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory (no persistence)
    #[default]
    Memory,

    /// SQLite database file
    #[cfg(feature = "sqlite")]
    Sqlite { path: std::path::PathBuf },
}

/// What sits in front of the index store on the read path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheConfig {
    /// No caching; every lookup hits the store.
    None,

    /// Unbounded in-process map.
    #[default]
    Memory,

    /// Bounded cache with a time-to-live.
    #[cfg(feature = "moka")]
    Moka { max_entries: u64, ttl_secs: u64 },
}

/// Everything needed to open an engine in one place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub indexer: IndexerConfig,
    pub store: StoreConfig,
    pub cache: CacheConfig,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = IndexerConfig::default();
        assert_eq!(cfg.column_separator, "__");
        assert_eq!(cfg.max_value_len, 128);
        assert_eq!(cfg.invalidation, InvalidationPolicy::OldAndNew);
        assert!(cfg.cache_negative_results);
    }

    #[test]
    fn test_value_length_bound() {
        let cfg = IndexerConfig { max_value_len: 4, ..Default::default() };
        assert_eq!(cfg.index_value("p", "name", &Value::from("Ada")).unwrap().as_deref(), Some("Ada"));
        assert_eq!(cfg.index_value("p", "name", &Value::Null).unwrap(), None);
        assert!(matches!(cfg.index_value("p", "name", &Value::from("Grace")), Err(Error::Usage(_))));
        assert!(matches!(cfg.index_value("", "name", &Value::from("Ada")), Err(Error::Usage(_))));
    }

    #[test]
    fn test_engine_config_from_json() {
        let cfg = EngineConfig::from_json(
            r#"{"indexer": {"column_separator": ".", "invalidation": "new_value_only"},
                "cache": {"kind": "none"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.indexer.column_separator, ".");
        assert_eq!(cfg.indexer.max_value_len, 128);
        assert_eq!(cfg.indexer.invalidation, InvalidationPolicy::NewValueOnly);
        assert_eq!(cfg.store, StoreConfig::Memory);
        assert_eq!(cfg.cache, CacheConfig::None);
    }

    #[test]
    fn test_bad_config_is_serialization_error() {
        assert!(matches!(EngineConfig::from_json("{nope"), Err(Error::Serialization(_))));
    }
}
