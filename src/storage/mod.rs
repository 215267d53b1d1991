//! # Index Store Trait
//!
//! This is THE contract between the engine and whatever holds index rows.
//! Every read and write the maintainer and lookup engine need is defined
//! here.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryIndexStore` | `memory` | In-memory for testing/embedding |
//! | `SqliteIndexStore` | `sqlite` | SQLite table with a UNIQUE constraint (feature `sqlite`) |
//!
//! ## Atomicity
//!
//! [`IndexStore::reconcile_row`] is a read-modify-write of one row and must
//! be atomic against concurrent reconciliations of the same
//! `(type_key, object_id, column)`. The engine holds no locks of its own.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::model::{IndexRow, ObjectId};

pub use memory::MemoryIndexStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteIndexStore;

// ============================================================================
// Row change
// ============================================================================

/// What a reconciliation did to the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    /// No row existed; one was inserted.
    Inserted,
    /// The row existed with a different value.
    Updated { previous: String },
    /// The row existed and the new value was empty, so it was deleted.
    Removed { previous: String },
    /// Nothing to do: same value, or empty value and no row.
    Unchanged,
}

impl RowChange {
    /// The value the row held before, when it held a different one.
    pub fn previous_value(&self) -> Option<&str> {
        match self {
            RowChange::Updated { previous } | RowChange::Removed { previous } => Some(previous),
            RowChange::Inserted | RowChange::Unchanged => None,
        }
    }
}

// ============================================================================
// IndexStore Trait
// ============================================================================

/// The durable table of index rows.
///
/// Rows are keyed by `(type_key, object_id, column)` with at most one value
/// each, which implies uniqueness of `(type_key, column, value, object_id)`.
/// Store-level failures come back as [`Error::Storage`](crate::Error::Storage)
/// or [`Error::ConstraintViolation`](crate::Error::ConstraintViolation).
#[async_trait]
pub trait IndexStore: Send + Sync + 'static {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Flush and release resources.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Bring one row in line with the live value, atomically.
    ///
    /// `Some(value)` inserts the row or updates its value; `None` deletes it.
    async fn reconcile_row(
        &self,
        type_key: &str,
        object_id: &ObjectId,
        column: &str,
        value: Option<&str>,
    ) -> Result<RowChange>;

    /// Delete every row for an object. Returns the rows removed.
    async fn delete_object_rows(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>>;

    /// Delete every row for a column. Returns the distinct values removed.
    async fn delete_column_rows(&self, type_key: &str, column: &str) -> Result<Vec<String>>;

    // ========================================================================
    // Reads
    // ========================================================================

    /// Object ids with `column = value`, ascending, no duplicates.
    async fn object_ids(&self, type_key: &str, column: &str, value: &str) -> Result<Vec<ObjectId>>;

    /// All rows for one object, ordered by column.
    async fn rows_for_object(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>>;

    /// Number of rows under a type key.
    async fn row_count(&self, type_key: &str) -> Result<u64>;

    /// Whether a specific row exists.
    ///
    /// Default: scan the candidate list for the predicate.
    async fn contains(
        &self,
        type_key: &str,
        column: &str,
        value: &str,
        object_id: &ObjectId,
    ) -> Result<bool> {
        let ids = self.object_ids(type_key, column, value).await?;
        Ok(ids.binary_search(object_id).is_ok())
    }
}

// ============================================================================
// Shared handles
// ============================================================================

#[async_trait]
impl<S: IndexStore + ?Sized> IndexStore for Arc<S> {
    async fn shutdown(&self) -> Result<()> {
        (**self).shutdown().await
    }

    async fn reconcile_row(
        &self,
        type_key: &str,
        object_id: &ObjectId,
        column: &str,
        value: Option<&str>,
    ) -> Result<RowChange> {
        (**self).reconcile_row(type_key, object_id, column, value).await
    }

    async fn delete_object_rows(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>> {
        (**self).delete_object_rows(type_key, object_id).await
    }

    async fn delete_column_rows(&self, type_key: &str, column: &str) -> Result<Vec<String>> {
        (**self).delete_column_rows(type_key, column).await
    }

    async fn object_ids(&self, type_key: &str, column: &str, value: &str) -> Result<Vec<ObjectId>> {
        (**self).object_ids(type_key, column, value).await
    }

    async fn rows_for_object(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>> {
        (**self).rows_for_object(type_key, object_id).await
    }

    async fn row_count(&self, type_key: &str) -> Result<u64> {
        (**self).row_count(type_key).await
    }

    async fn contains(
        &self,
        type_key: &str,
        column: &str,
        value: &str,
        object_id: &ObjectId,
    ) -> Result<bool> {
        (**self).contains(type_key, column, value, object_id).await
    }
}
