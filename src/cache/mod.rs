//! # Cache Layer
//!
//! String-keyed cache of per-predicate candidate lists, sitting in front of
//! the index store on the read path.
//!
//! ## Implementations
//!
//! | Cache | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryCache` | `memory` | Unbounded map with hit/miss counters |
//! | `MokaCache` | `bounded` | Bounded, TTL-evicting (feature `moka`) |
//! | `NoCache` | here | Always misses; strict-consistency reads |
//!
//! A present entry is trusted as fresh. Keeping entries fresh is the
//! maintainer's job; see [`InvalidationPolicy`](crate::InvalidationPolicy).

pub mod memory;
#[cfg(feature = "moka")]
pub mod bounded;

use std::fmt;
use std::sync::Arc;

use crate::model::ObjectId;

pub use memory::{CacheStats, MemoryCache};
#[cfg(feature = "moka")]
pub use bounded::MokaCache;

// ============================================================================
// Cache keys
// ============================================================================

/// Key for one `(type_key, column, value)` predicate: `type:column=value`.
///
/// `\`, `:` and `=` inside each part are backslash-escaped, so distinct
/// predicates never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(type_key: &str, column: &str, value: &str) -> Self {
        let mut key = String::with_capacity(type_key.len() + column.len() + value.len() + 2);
        push_escaped(&mut key, type_key);
        key.push(':');
        push_escaped(&mut key, column);
        key.push('=');
        push_escaped(&mut key, value);
        Self(key)
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn push_escaped(key: &mut String, part: &str) {
    for ch in part.chars() {
        if matches!(ch, '\\' | ':' | '=') {
            key.push('\\');
        }
        key.push(ch);
    }
}

// ============================================================================
// IndexCache trait
// ============================================================================

/// The cache contract. No ordering or transactional guarantees.
pub trait IndexCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<ObjectId>>;
    fn set(&self, key: &str, ids: Vec<ObjectId>);
    fn delete(&self, key: &str);
}

impl<C: IndexCache + ?Sized> IndexCache for Arc<C> {
    fn get(&self, key: &str) -> Option<Vec<ObjectId>> { (**self).get(key) }
    fn set(&self, key: &str, ids: Vec<ObjectId>) { (**self).set(key, ids) }
    fn delete(&self, key: &str) { (**self).delete(key) }
}

/// A cache that never holds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl IndexCache for NoCache {
    fn get(&self, _key: &str) -> Option<Vec<ObjectId>> { None }
    fn set(&self, _key: &str, _ids: Vec<ObjectId>) {}
    fn delete(&self, _key: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = CacheKey::new("person", "address__city", "NYC");
        assert_eq!(key.as_str(), "person:address__city=NYC");

        let key = CacheKey::new("crm:person", "city", "a=b\\c");
        assert_eq!(key.as_str(), "crm\\:person:city=a\\=b\\\\c");
    }

    #[test]
    fn test_separators_inside_parts_do_not_collide() {
        assert_ne!(CacheKey::new("p", "x", "y=z"), CacheKey::new("p", "x=y", "z"));
        assert_ne!(CacheKey::new("a:b", "c", "v"), CacheKey::new("a", "b:c", "v"));
        assert_ne!(CacheKey::new("p", "x\\", "=y"), CacheKey::new("p", "x", "\\=y"));
    }

    #[test]
    fn test_no_cache_never_hits() {
        let cache = NoCache;
        cache.set("k", vec![ObjectId::Int(1)]);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_arc_delegates() {
        let shared = Arc::new(MemoryCache::new());
        let handle: Arc<dyn IndexCache> = shared.clone();
        handle.set("k", vec![ObjectId::Int(1)]);
        assert_eq!(shared.get("k"), Some(vec![ObjectId::Int(1)]));
    }
}
