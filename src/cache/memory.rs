//! In-process cache backed by a HashMap behind a RwLock.

use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;

use super::IndexCache;
use crate::model::ObjectId;

/// Unbounded in-memory cache.
///
/// Never evicts; entries leave only through `delete` or `clear`. Counts
/// every call so tests and callers can see what the read path did.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<ObjectId>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

/// Snapshot of [`MemoryCache`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Peek without touching the counters.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}

impl IndexCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<ObjectId>> {
        let found = self.entries.read().get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn set(&self, key: &str, ids: Vec<ObjectId>) {
        self.sets.fetch_add(1, Ordering::Relaxed);
        self.entries.write().insert(key.to_owned(), ids);
    }

    fn delete(&self, key: &str) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.entries.write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_delete() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("p:name=Ada"), None);

        cache.set("p:name=Ada", vec![ObjectId::Int(1), ObjectId::Int(2)]);
        assert_eq!(cache.get("p:name=Ada"), Some(vec![ObjectId::Int(1), ObjectId::Int(2)]));

        cache.delete("p:name=Ada");
        assert!(!cache.contains("p:name=Ada"));
        assert_eq!(
            cache.stats(),
            CacheStats { hits: 1, misses: 1, sets: 1, deletes: 1 }
        );
    }

    #[test]
    fn test_empty_list_is_a_hit() {
        let cache = MemoryCache::new();
        cache.set("p:name=Nobody", Vec::new());
        assert_eq!(cache.get("p:name=Nobody"), Some(Vec::new()));
        assert_eq!(cache.stats().hits, 1);
    }
}
