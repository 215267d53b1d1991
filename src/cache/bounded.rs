//! Bounded cache on top of moka.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use super::IndexCache;
use crate::model::ObjectId;

/// Size- and time-bounded cache.
///
/// The TTL caps how long a stale entry can survive when a write path
/// skipped its invalidation.
pub struct MokaCache {
    cache: Cache<String, Arc<Vec<ObjectId>>>,
}

impl MokaCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .eviction_listener(|key, _value, cause| {
                tracing::trace!(key = %key, ?cause, "cache entry evicted");
            })
            .build();
        Self { cache }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl IndexCache for MokaCache {
    fn get(&self, key: &str) -> Option<Vec<ObjectId>> {
        self.cache.get(key).map(|ids| ids.as_ref().clone())
    }

    fn set(&self, key: &str, ids: Vec<ObjectId>) {
        self.cache.insert(key.to_owned(), Arc::new(ids));
    }

    fn delete(&self, key: &str) {
        self.cache.invalidate(key);
    }
}
