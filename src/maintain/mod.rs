//! Index maintenance: the write path.
//!
//! Reacts to object saves and deletes by reconciling index rows, clears the
//! cache entries those writes make stale, and backfills columns that were
//! registered after their objects already existed.
//!
//! No retries happen here. A store error aborts the call and propagates;
//! backfill callers retry per object, which is safe because reconciling a
//! row to the value it already holds is a no-op.

use tracing::{debug, info};

use crate::cache::{CacheKey, IndexCache};
use crate::config::{IndexerConfig, InvalidationPolicy};
use crate::model::{ColumnPath, Indexable, ObjectId, resolve_path, validate_type_key};
use crate::registry::IndexRegistry;
use crate::storage::{IndexStore, RowChange};
use crate::Result;

/// Per-call counts of what a save did to the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl SaveSummary {
    fn record(&mut self, change: &RowChange) {
        match change {
            RowChange::Inserted => self.inserted += 1,
            RowChange::Updated { .. } => self.updated += 1,
            RowChange::Removed { .. } => self.removed += 1,
            RowChange::Unchanged => self.unchanged += 1,
        }
    }
}

/// Result of a backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Objects looked at.
    pub scanned: usize,
    /// Objects that now have a row for the column.
    pub indexed: usize,
    /// Objects whose value was empty or missing.
    pub skipped: usize,
}

/// Borrowed view of the engine's parts, for the write path.
pub struct Maintainer<'a, S: IndexStore + ?Sized, C: IndexCache + ?Sized> {
    pub(crate) store: &'a S,
    pub(crate) cache: &'a C,
    pub(crate) registry: &'a IndexRegistry,
    pub(crate) config: &'a IndexerConfig,
}

impl<S: IndexStore + ?Sized, C: IndexCache + ?Sized> Maintainer<'_, S, C> {
    // ========================================================================
    // Lifecycle events
    // ========================================================================

    /// Reconcile every registered column of `object`.
    ///
    /// All values are resolved and validated before the first write, so a
    /// value over the length bound fails the call without touching the
    /// index. Each row write is atomic in the store; the save as a whole is
    /// not.
    pub async fn on_object_saved<O>(&self, type_key: &str, object: &O, is_new: bool) -> Result<SaveSummary>
    where
        O: Indexable + Sync + ?Sized,
    {
        validate_type_key(type_key)?;
        let object_id = object.object_id();

        let mut planned = Vec::new();
        for column in self.registry.columns(type_key) {
            let value = match resolve_path(object, &column) {
                Some(v) => self.config.index_value(type_key, column.as_str(), &v)?,
                None => None,
            };
            planned.push((column, value));
        }

        let mut summary = SaveSummary::default();
        for (column, value) in planned {
            // A brand-new object has no rows yet, so an empty value has
            // nothing to delete.
            if is_new && value.is_none() {
                summary.unchanged += 1;
                continue;
            }
            let change = self.write_row(type_key, &object_id, &column, value.as_deref()).await?;
            summary.record(&change);
        }

        debug!(type_key, object_id = %object_id, is_new, ?summary, "object saved");
        Ok(summary)
    }

    /// Remove every row for an object. Returns how many rows went away.
    pub async fn on_object_deleted(&self, type_key: &str, object_id: &ObjectId) -> Result<usize> {
        validate_type_key(type_key)?;
        let removed = self.store.delete_object_rows(type_key, object_id).await?;

        if self.config.invalidation == InvalidationPolicy::OldAndNew {
            for row in &removed {
                self.invalidate(type_key, &row.column, &row.value);
            }
        }

        debug!(type_key, object_id = %object_id, rows = removed.len(), "object deleted");
        Ok(removed.len())
    }

    // ========================================================================
    // Bulk maintenance
    // ========================================================================

    /// Register `column` and index every object in `objects`.
    ///
    /// Objects with an empty or missing value are skipped. Running it again
    /// over the same objects changes nothing.
    pub async fn backfill<'o, O, I>(&self, type_key: &str, column: &str, objects: I) -> Result<BackfillReport>
    where
        O: Indexable + Sync + 'o,
        I: IntoIterator<Item = &'o O>,
        I::IntoIter: Send,
    {
        validate_type_key(type_key)?;
        let column = self.config.parse_column(column)?;
        self.registry.register(type_key, column.clone());
        info!(type_key, column = %column, "backfill started");

        let mut report = BackfillReport::default();
        for object in objects {
            report.scanned += 1;
            let value = match resolve_path(object, &column) {
                Some(v) => self.config.index_value(type_key, column.as_str(), &v)?,
                None => None,
            };
            let Some(value) = value else {
                report.skipped += 1;
                continue;
            };
            self.write_row(type_key, &object.object_id(), &column, Some(&value)).await?;
            report.indexed += 1;
        }

        info!(type_key, column = %column, ?report, "backfill finished");
        Ok(report)
    }

    /// Unregister a column and delete its rows. Returns the number of
    /// distinct values that were indexed.
    pub async fn drop_column(&self, type_key: &str, column: &str) -> Result<usize> {
        validate_type_key(type_key)?;
        let was_registered = self.registry.unregister(type_key, column);
        let values = self.store.delete_column_rows(type_key, column).await?;
        for value in &values {
            self.invalidate(type_key, column, value);
        }
        info!(type_key, column, was_registered, values = values.len(), "column dropped");
        Ok(values.len())
    }

    // ========================================================================
    // Row reconciliation + invalidation
    // ========================================================================

    async fn write_row(
        &self,
        type_key: &str,
        object_id: &ObjectId,
        column: &ColumnPath,
        value: Option<&str>,
    ) -> Result<RowChange> {
        let change = self
            .store
            .reconcile_row(type_key, object_id, column.as_str(), value)
            .await?;

        if let Some(new) = value {
            self.invalidate(type_key, column.as_str(), new);
        }
        if self.config.invalidation == InvalidationPolicy::OldAndNew {
            if let Some(previous) = change.previous_value() {
                self.invalidate(type_key, column.as_str(), previous);
            }
        }

        debug!(type_key, object_id = %object_id, column = %column, ?change, "row reconciled");
        Ok(change)
    }

    fn invalidate(&self, type_key: &str, column: &str, value: &str) {
        let key = CacheKey::new(type_key, column, value);
        debug!(key = %key, "cache invalidated");
        self.cache.delete(key.as_str());
    }
}
