//! Lookup engine: the read path.
//!
//! A [`LazyLookup`] holds validated predicates and nothing else until it is
//! first consumed. Evaluation then walks the predicates in order, taking
//! each candidate list from the cache or, on a miss, from the store (and
//! caching what the store returned), and intersects the lists. The result
//! is memoized for the lifetime of the handle.

use hashbrown::HashSet;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::cache::{CacheKey, IndexCache};
use crate::model::ObjectId;
use crate::source::ObjectSource;
use crate::storage::IndexStore;
use crate::Result;

/// Read-path switches for one lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    /// Skip the cache entirely: no reads, no writes.
    pub bypass_cache: bool,
    /// Cache empty candidate lists.
    pub cache_negative_results: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self { bypass_cache: false, cache_negative_results: true }
    }
}

/// A predicate after validation: column name and serialized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedPredicate {
    pub column: String,
    pub value: String,
}

/// Deferred multi-predicate lookup.
///
/// Building one touches neither the store nor the cache. The first call
/// to [`ids`](Self::ids) (or anything built on it) evaluates; later calls
/// return the memoized list. First access needs `&mut self`, so sharing a
/// handle across tasks takes external synchronization.
pub struct LazyLookup<'a, S: IndexStore + ?Sized, C: IndexCache + ?Sized> {
    store: &'a S,
    cache: &'a C,
    type_key: String,
    predicates: SmallVec<[ResolvedPredicate; 4]>,
    options: LookupOptions,
    resolved: Option<Vec<ObjectId>>,
}

impl<'a, S: IndexStore + ?Sized, C: IndexCache + ?Sized> LazyLookup<'a, S, C> {
    pub(crate) fn new(
        store: &'a S,
        cache: &'a C,
        type_key: String,
        predicates: SmallVec<[ResolvedPredicate; 4]>,
        options: LookupOptions,
    ) -> Self {
        Self { store, cache, type_key, predicates, options, resolved: None }
    }

    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    pub fn is_evaluated(&self) -> bool {
        self.resolved.is_some()
    }

    /// Matching object ids, evaluating on first call.
    ///
    /// Order follows the first predicate's candidate list (ascending ids
    /// from the store). Ids may refer to objects deleted since they were
    /// cached; resolve them with [`objects`](Self::objects) to drop those.
    pub async fn ids(&mut self) -> Result<&[ObjectId]> {
        if self.resolved.is_none() {
            let ids = self.evaluate().await?;
            self.resolved = Some(ids);
        }
        Ok(self.resolved.as_deref().unwrap_or_default())
    }

    pub async fn into_ids(mut self) -> Result<Vec<ObjectId>> {
        self.ids().await?;
        Ok(self.resolved.take().unwrap_or_default())
    }

    pub async fn len(&mut self) -> Result<usize> {
        Ok(self.ids().await?.len())
    }

    pub async fn is_empty(&mut self) -> Result<bool> {
        Ok(self.ids().await?.is_empty())
    }

    /// Resolve the ids into live objects through the object store.
    ///
    /// Ids that no longer resolve are dropped silently.
    pub async fn objects<Src: ObjectSource + ?Sized>(&mut self, source: &Src) -> Result<Vec<Src::Object>> {
        let type_key = self.type_key.clone();
        let ids = self.ids().await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        source.resolve(&type_key, ids).await
    }

    async fn evaluate(&self) -> Result<Vec<ObjectId>> {
        let mut result: Option<Vec<ObjectId>> = None;

        for predicate in &self.predicates {
            let candidates = self.candidates(predicate).await?;
            let narrowed = match result {
                None => dedup(candidates),
                Some(acc) => intersect(acc, &candidates),
            };
            if narrowed.is_empty() {
                trace!(type_key = %self.type_key, column = %predicate.column, "empty candidate set");
                return Ok(Vec::new());
            }
            result = Some(narrowed);
        }

        let ids = result.unwrap_or_default();
        debug!(type_key = %self.type_key, predicates = self.predicates.len(), matches = ids.len(), "lookup evaluated");
        Ok(ids)
    }

    async fn candidates(&self, predicate: &ResolvedPredicate) -> Result<Vec<ObjectId>> {
        let key = CacheKey::new(&self.type_key, &predicate.column, &predicate.value);

        if !self.options.bypass_cache {
            if let Some(ids) = self.cache.get(key.as_str()) {
                trace!(key = %key, hits = ids.len(), "cache hit");
                return Ok(ids);
            }
        }

        let ids = self
            .store
            .object_ids(&self.type_key, &predicate.column, &predicate.value)
            .await?;

        if !self.options.bypass_cache && (!ids.is_empty() || self.options.cache_negative_results) {
            self.cache.set(key.as_str(), ids.clone());
        }
        Ok(ids)
    }
}

/// Order-preserving dedup.
fn dedup(ids: Vec<ObjectId>) -> Vec<ObjectId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Keep the members of `acc` that also appear in `other`, in `acc` order.
pub(crate) fn intersect(acc: Vec<ObjectId>, other: &[ObjectId]) -> Vec<ObjectId> {
    let other: HashSet<&ObjectId> = other.iter().collect();
    acc.into_iter().filter(|id| other.contains(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::storage::MemoryIndexStore;
    use proptest::prelude::*;

    fn ids(ns: &[u64]) -> Vec<ObjectId> {
        ns.iter().map(|&n| ObjectId::Int(n)).collect()
    }

    fn pred(column: &str, value: &str) -> ResolvedPredicate {
        ResolvedPredicate { column: column.into(), value: value.into() }
    }

    #[test]
    fn test_intersect_keeps_left_order() {
        assert_eq!(intersect(ids(&[3, 1, 2]), &ids(&[2, 3])), ids(&[3, 2]));
        assert!(intersect(ids(&[1]), &[]).is_empty());
    }

    #[test]
    fn test_dedup() {
        assert_eq!(dedup(ids(&[2, 1, 2, 3, 1])), ids(&[2, 1, 3]));
    }

    #[tokio::test]
    async fn test_nothing_happens_until_consumed() {
        let store = MemoryIndexStore::new();
        let cache = MemoryCache::new();
        store.reconcile_row("p", &ObjectId::Int(1), "city", Some("NYC")).await.unwrap();
        let before = store.stats();

        let mut lookup = LazyLookup::new(
            &store, &cache, "p".into(), [pred("city", "NYC")].into_iter().collect(),
            LookupOptions::default(),
        );
        assert!(!lookup.is_evaluated());
        assert_eq!(store.stats(), before);
        assert_eq!(cache.stats().misses, 0);

        assert_eq!(lookup.ids().await.unwrap(), ids(&[1]).as_slice());
        assert_eq!(lookup.ids().await.unwrap(), ids(&[1]).as_slice());
        assert_eq!(store.stats().reads, before.reads + 1);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().sets, 1);
    }

    #[tokio::test]
    async fn test_short_circuit_on_empty_candidates() {
        let store = MemoryIndexStore::new();
        let cache = MemoryCache::new();
        store.reconcile_row("p", &ObjectId::Int(1), "age", Some("30")).await.unwrap();

        let lookup = LazyLookup::new(
            &store, &cache, "p".into(),
            [pred("city", "Nowhere"), pred("age", "30")].into_iter().collect(),
            LookupOptions::default(),
        );
        assert!(lookup.into_ids().await.unwrap().is_empty());
        assert_eq!(store.stats().reads, 1);
        assert!(cache.contains("p:city=Nowhere"));
        assert!(!cache.contains("p:age=30"));
    }

    #[tokio::test]
    async fn test_negative_results_not_cached_when_disabled() {
        let store = MemoryIndexStore::new();
        let cache = MemoryCache::new();
        let options = LookupOptions { cache_negative_results: false, ..Default::default() };

        let lookup = LazyLookup::new(&store, &cache, "p".into(), [pred("city", "X")].into_iter().collect(), options);
        assert!(lookup.into_ids().await.unwrap().is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_bypass_cache() {
        let store = MemoryIndexStore::new();
        let cache = MemoryCache::new();
        cache.set("p:city=NYC", ids(&[99]));
        store.reconcile_row("p", &ObjectId::Int(1), "city", Some("NYC")).await.unwrap();
        let options = LookupOptions { bypass_cache: true, ..Default::default() };

        let lookup = LazyLookup::new(&store, &cache, "p".into(), [pred("city", "NYC")].into_iter().collect(), options);
        assert_eq!(lookup.into_ids().await.unwrap(), ids(&[1]));
        assert_eq!(cache.get("p:city=NYC"), Some(ids(&[99])));
    }

    proptest! {
        #[test]
        fn prop_intersect_matches_set_semantics(
            a in proptest::collection::vec(0u64..20, 0..30),
            b in proptest::collection::vec(0u64..20, 0..30),
        ) {
            let got: std::collections::BTreeSet<u64> = intersect(dedup(ids(&a)), &ids(&b))
                .into_iter()
                .filter_map(|id| id.as_int())
                .collect();
            let sa: std::collections::BTreeSet<u64> = a.iter().copied().collect();
            let sb: std::collections::BTreeSet<u64> = b.iter().copied().collect();
            let want: std::collections::BTreeSet<u64> = sa.intersection(&sb).copied().collect();
            prop_assert_eq!(got, want);
        }

        #[test]
        fn prop_intersect_is_order_independent(
            a in proptest::collection::btree_set(0u64..20, 0..15),
            b in proptest::collection::btree_set(0u64..20, 0..15),
        ) {
            let a: Vec<u64> = a.into_iter().collect();
            let b: Vec<u64> = b.into_iter().collect();
            prop_assert_eq!(intersect(ids(&a), &ids(&b)), intersect(ids(&b), &ids(&a)));
        }
    }
}
