//! # attrindex - Secondary Attribute Index
//!
//! A denormalized secondary-index table over an external object store. Any
//! object type can register indexed columns (including nested paths like
//! `address__city`); the engine keeps one index row per object and column
//! in step with object saves and deletes, and answers equality lookups,
//! single or ANDed together, through a cache in front of the table.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `IndexStore` and `IndexCache` are the contracts to
//!    storage and cache; `Indexable` and `ObjectSource` are the contracts to
//!    the object store
//! 2. **Push, not poll**: the object store reports committed mutations via
//!    `on_object_saved` / `on_object_deleted` / `dispatch`
//! 3. **Atomic rows**: each row's read-modify-write is one unit in the store
//! 4. **Lazy reads**: a lookup does no I/O until consumed, then memoizes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use attrindex::{Document, Indexer, Predicate};
//!
//! # async fn example() -> attrindex::Result<()> {
//! let indexer = Indexer::open_memory();
//! indexer.register("crm:person", "city")?;
//! indexer.register("crm:person", "age")?;
//!
//! let ada = Document::new("crm:person", 1u64)
//!     .with_property("city", "NYC")
//!     .with_property("age", 30);
//! indexer.on_object_saved("crm:person", &ada, true).await?;
//!
//! let mut hits = indexer.lookup(
//!     "crm:person",
//!     [Predicate::new("city", "NYC"), Predicate::new("age", 30)],
//! )?;
//! for id in hits.ids().await? {
//!     println!("{id}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Consistency
//!
//! The cache trusts what it holds. With the default
//! [`InvalidationPolicy::OldAndNew`], every write clears the entries for
//! both the new and the replaced value, and deletes clear the entries for
//! every removed row. [`InvalidationPolicy::NewValueOnly`] only clears the
//! new value's entry, so a lookup on an object's former value can keep
//! returning it until the entry is evicted. Either way, concurrent writers
//! and readers race on the cache; callers that need read-your-writes use
//! [`LookupOptions::bypass_cache`] or [`NoCache`].

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod config;
pub mod cache;
pub mod storage;
pub mod registry;
pub mod maintain;
pub mod lookup;
pub mod events;
pub mod source;

use std::sync::Arc;

use tracing::info;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    ColumnPath, Document, IndexRow, Indexable, ObjectId, Predicate, Predicates,
    PropertyMap, Value,
};

// ============================================================================
// Re-exports: Engine parts
// ============================================================================

pub use cache::{CacheKey, IndexCache, MemoryCache, NoCache};
#[cfg(feature = "moka")]
pub use cache::MokaCache;
pub use config::{CacheConfig, EngineConfig, IndexerConfig, InvalidationPolicy, StoreConfig};
pub use events::{DispatchOutcome, ObjectEvent};
pub use lookup::{LazyLookup, LookupOptions};
pub use maintain::{BackfillReport, SaveSummary};
pub use registry::{IndexRegistry, Registration};
pub use source::{MemoryObjectSource, ObjectSource};
pub use storage::{IndexStore, MemoryIndexStore, RowChange};
#[cfg(feature = "sqlite")]
pub use storage::SqliteIndexStore;

use lookup::ResolvedPredicate;
use maintain::Maintainer;

// ============================================================================
// Top-level Indexer handle
// ============================================================================

/// The primary entry point: an index store, a cache in front of it, and
/// the registry of indexed columns.
pub struct Indexer<S: IndexStore, C: IndexCache = MemoryCache> {
    store: S,
    cache: C,
    registry: IndexRegistry,
    config: IndexerConfig,
}

/// An indexer assembled at runtime from an [`EngineConfig`].
pub type DynIndexer = Indexer<Arc<dyn IndexStore>, Arc<dyn IndexCache>>;

impl<S: IndexStore, C: IndexCache> Indexer<S, C> {
    /// Create an Indexer from its parts. The registry starts empty.
    pub fn with_parts(store: S, cache: C, config: IndexerConfig) -> Self {
        Self { store, cache, registry: IndexRegistry::new(), config }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register an indexed column for a type.
    ///
    /// Idempotent. Existing objects are NOT indexed by this call; run
    /// [`backfill`](Self::backfill) for that.
    pub fn register(&self, type_key: &str, column: &str) -> Result<Registration> {
        model::validate_type_key(type_key)?;
        let column = self.config.parse_column(column)?;
        let reg = self.registry.register(type_key, column.clone());
        if reg.newly_added {
            info!(type_key, column = %column, subscribed = reg.subscribed, "column registered");
        }
        Ok(reg)
    }

    pub fn is_registered(&self, type_key: &str, column: &str) -> bool {
        self.registry.is_registered(type_key, column)
    }

    // ========================================================================
    // Write path
    // ========================================================================

    /// Push interface for a committed create or update.
    pub async fn on_object_saved<O>(&self, type_key: &str, object: &O, is_new: bool) -> Result<SaveSummary>
    where
        O: Indexable + Sync + ?Sized,
    {
        self.maintainer().on_object_saved(type_key, object, is_new).await
    }

    /// Push interface for a committed delete.
    pub async fn on_object_deleted(&self, type_key: &str, object_id: &ObjectId) -> Result<usize> {
        self.maintainer().on_object_deleted(type_key, object_id).await
    }

    /// Route a lifecycle event. Events for types nothing is subscribed to
    /// are ignored.
    pub async fn dispatch<O>(&self, event: &ObjectEvent<O>) -> Result<DispatchOutcome>
    where
        O: Indexable + Sync,
    {
        if !self.registry.is_subscribed(event.type_key()) {
            return Ok(DispatchOutcome::Ignored);
        }
        match event {
            ObjectEvent::Saved { type_key, object, is_new } => self
                .on_object_saved(type_key, object, *is_new)
                .await
                .map(DispatchOutcome::Saved),
            ObjectEvent::Deleted { type_key, object_id } => self
                .on_object_deleted(type_key, object_id)
                .await
                .map(DispatchOutcome::Deleted),
        }
    }

    /// Register `column` and index the given existing objects.
    pub async fn backfill<'o, O, I>(&self, type_key: &str, column: &str, objects: I) -> Result<BackfillReport>
    where
        O: Indexable + Sync + 'o,
        I: IntoIterator<Item = &'o O>,
        I::IntoIter: Send,
    {
        self.maintainer().backfill(type_key, column, objects).await
    }

    /// Register `column` and index every object the source holds for the type.
    pub async fn backfill_from<Src>(&self, source: &Src, type_key: &str, column: &str) -> Result<BackfillReport>
    where
        Src: ObjectSource + ?Sized,
    {
        let objects = source.all_objects(type_key).await?;
        self.backfill(type_key, column, &objects).await
    }

    /// Unregister a column and delete its rows.
    pub async fn drop_column(&self, type_key: &str, column: &str) -> Result<usize> {
        self.maintainer().drop_column(type_key, column).await
    }

    // ========================================================================
    // Read path
    // ========================================================================

    /// Build a lazy lookup for objects matching every predicate.
    ///
    /// Validation happens now; store and cache are untouched until the
    /// result is consumed. Fails with [`Error::Usage`] for an empty
    /// predicate set, an unregistered column, or an empty or over-long
    /// value.
    pub fn lookup<I, P>(&self, type_key: &str, predicates: I) -> Result<LazyLookup<'_, S, C>>
    where
        I: IntoIterator<Item = P>,
        P: Into<Predicate>,
    {
        let options = LookupOptions {
            bypass_cache: false,
            cache_negative_results: self.config.cache_negative_results,
        };
        self.lookup_with(type_key, predicates, options)
    }

    pub fn lookup_with<I, P>(
        &self,
        type_key: &str,
        predicates: I,
        options: LookupOptions,
    ) -> Result<LazyLookup<'_, S, C>>
    where
        I: IntoIterator<Item = P>,
        P: Into<Predicate>,
    {
        model::validate_type_key(type_key)?;
        let predicates: Predicates = predicates.into_iter().map(Into::into).collect();
        if predicates.is_empty() {
            return Err(Error::Usage("lookup needs at least one predicate".into()));
        }

        let mut resolved = smallvec::SmallVec::with_capacity(predicates.len());
        for Predicate { column, value } in predicates {
            if !self.registry.is_registered(type_key, &column) {
                return Err(Error::Usage(format!("column '{column}' is not registered for '{type_key}'")));
            }
            let Some(value) = self.config.index_value(type_key, &column, &value)? else {
                return Err(Error::Usage(format!("empty value for '{column}' can never match")));
            };
            resolved.push(ResolvedPredicate { column, value });
        }

        Ok(LazyLookup::new(&self.store, &self.cache, type_key.to_owned(), resolved, options))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub async fn row_count(&self, type_key: &str) -> Result<u64> {
        self.store.row_count(type_key).await
    }

    pub async fn rows_for_object(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>> {
        self.store.rows_for_object(type_key, object_id).await
    }

    pub fn registry(&self) -> &IndexRegistry { &self.registry }
    pub fn store(&self) -> &S { &self.store }
    pub fn cache(&self) -> &C { &self.cache }
    pub fn config(&self) -> &IndexerConfig { &self.config }

    pub async fn shutdown(&self) -> Result<()> {
        self.store.shutdown().await
    }

    fn maintainer(&self) -> Maintainer<'_, S, C> {
        Maintainer {
            store: &self.store,
            cache: &self.cache,
            registry: &self.registry,
            config: &self.config,
        }
    }
}

/// In-memory indexer for testing and embedding.
impl Indexer<MemoryIndexStore, MemoryCache> {
    pub fn open_memory() -> Self {
        Self::with_parts(MemoryIndexStore::new(), MemoryCache::new(), IndexerConfig::default())
    }
}

impl DynIndexer {
    /// Assemble store and cache from configuration.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let store: Arc<dyn IndexStore> = match &config.store {
            StoreConfig::Memory => Arc::new(MemoryIndexStore::new()),
            #[cfg(feature = "sqlite")]
            StoreConfig::Sqlite { path } => Arc::new(SqliteIndexStore::open(path)?),
        };
        let cache: Arc<dyn IndexCache> = match &config.cache {
            CacheConfig::None => Arc::new(NoCache),
            CacheConfig::Memory => Arc::new(MemoryCache::new()),
            #[cfg(feature = "moka")]
            CacheConfig::Moka { max_entries, ttl_secs } => {
                Arc::new(MokaCache::new(*max_entries, std::time::Duration::from_secs(*ttl_secs)))
            }
        };
        info!(store = ?config.store, cache = ?config.cache, "indexer opened");
        Ok(Self::with_parts(store, cache, config.indexer))
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller asked for something the engine cannot do as asked.
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
