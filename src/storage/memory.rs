//! In-memory index store.
//!
//! This is the reference implementation of `IndexStore`. Two maps behind a
//! single `RwLock`: rows keyed by object, and postings keyed by
//! `(column, value)`. Every write takes the write lock for its whole
//! read-modify-write, which is what makes `reconcile_row` atomic.
//!
//! ## Limitations
//!
//! - **No persistence**: rows live as long as the process.
//! - **One lock for everything**: writers to unrelated types still
//!   serialize. Fine for tests and embedding; use a real database for heavy
//!   concurrent write load.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;

use super::{IndexStore, RowChange};
use crate::Result;
use crate::model::{IndexRow, ObjectId};

// ============================================================================
// MemoryIndexStore
// ============================================================================

/// In-memory index table. Clones share the same rows.
#[derive(Clone, Default)]
pub struct MemoryIndexStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tables: RwLock<HashMap<String, TypeTable>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

/// Rows for one type key.
#[derive(Default)]
struct TypeTable {
    /// object_id → column → value
    objects: HashMap<ObjectId, BTreeMap<String, String>>,
    /// (column, value) → object ids
    postings: HashMap<(String, String), BTreeSet<ObjectId>>,
}

impl TypeTable {
    fn add_posting(&mut self, column: &str, value: &str, id: &ObjectId) {
        self.postings
            .entry((column.to_owned(), value.to_owned()))
            .or_default()
            .insert(id.clone());
    }

    fn remove_posting(&mut self, column: &str, value: &str, id: &ObjectId) {
        let key = (column.to_owned(), value.to_owned());
        if let Some(ids) = self.postings.get_mut(&key) {
            ids.remove(id);
            if ids.is_empty() {
                self.postings.remove(&key);
            }
        }
    }

    fn row_count(&self) -> u64 {
        self.objects.values().map(|cols| cols.len() as u64).sum()
    }
}

/// Counters for calls that touched the rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub writes: u64,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.inner.reads.load(Ordering::Relaxed),
            writes: self.inner.writes.load(Ordering::Relaxed),
        }
    }

    /// Every row, ordered. For debugging and tests.
    pub fn dump(&self) -> Vec<IndexRow> {
        let tables = self.inner.tables.read();
        let mut rows: Vec<IndexRow> = tables
            .iter()
            .flat_map(|(type_key, table)| {
                table.objects.iter().flat_map(move |(id, cols)| {
                    cols.iter().map(move |(column, value)| {
                        IndexRow::new(type_key.as_str(), column.as_str(), value.as_str(), id.clone())
                    })
                })
            })
            .collect();
        rows.sort();
        rows
    }

    fn count_read(&self) {
        self.inner.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn count_write(&self) {
        self.inner.writes.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// IndexStore impl
// ============================================================================

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn reconcile_row(
        &self,
        type_key: &str,
        object_id: &ObjectId,
        column: &str,
        value: Option<&str>,
    ) -> Result<RowChange> {
        self.count_write();
        let mut tables = self.inner.tables.write();

        let previous = tables
            .get(type_key)
            .and_then(|t| t.objects.get(object_id))
            .and_then(|cols| cols.get(column))
            .cloned();

        let change = match (previous, value) {
            (None, None) => RowChange::Unchanged,
            (Some(prev), Some(new)) if prev == new => RowChange::Unchanged,
            (None, Some(new)) => {
                let table = tables.entry(type_key.to_owned()).or_default();
                table.objects.entry(object_id.clone()).or_default()
                    .insert(column.to_owned(), new.to_owned());
                table.add_posting(column, new, object_id);
                RowChange::Inserted
            }
            (Some(prev), Some(new)) => {
                let table = tables.entry(type_key.to_owned()).or_default();
                table.remove_posting(column, &prev, object_id);
                table.objects.entry(object_id.clone()).or_default()
                    .insert(column.to_owned(), new.to_owned());
                table.add_posting(column, new, object_id);
                RowChange::Updated { previous: prev }
            }
            (Some(prev), None) => {
                let table = tables.entry(type_key.to_owned()).or_default();
                table.remove_posting(column, &prev, object_id);
                if let Some(cols) = table.objects.get_mut(object_id) {
                    cols.remove(column);
                    if cols.is_empty() {
                        table.objects.remove(object_id);
                    }
                }
                RowChange::Removed { previous: prev }
            }
        };
        Ok(change)
    }

    async fn delete_object_rows(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>> {
        self.count_write();
        let mut tables = self.inner.tables.write();
        let Some(table) = tables.get_mut(type_key) else {
            return Ok(Vec::new());
        };
        let Some(cols) = table.objects.remove(object_id) else {
            return Ok(Vec::new());
        };

        let mut removed = Vec::with_capacity(cols.len());
        for (column, value) in cols {
            table.remove_posting(&column, &value, object_id);
            removed.push(IndexRow::new(type_key, column, value, object_id.clone()));
        }
        Ok(removed)
    }

    async fn delete_column_rows(&self, type_key: &str, column: &str) -> Result<Vec<String>> {
        self.count_write();
        let mut tables = self.inner.tables.write();
        let Some(table) = tables.get_mut(type_key) else {
            return Ok(Vec::new());
        };

        let mut values = BTreeSet::new();
        table.objects.retain(|_, cols| {
            if let Some(value) = cols.remove(column) {
                values.insert(value);
            }
            !cols.is_empty()
        });
        table.postings.retain(|(col, _), _| col != column);
        Ok(values.into_iter().collect())
    }

    async fn object_ids(&self, type_key: &str, column: &str, value: &str) -> Result<Vec<ObjectId>> {
        self.count_read();
        let tables = self.inner.tables.read();
        let key = (column.to_owned(), value.to_owned());
        Ok(tables
            .get(type_key)
            .and_then(|t| t.postings.get(&key))
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn rows_for_object(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>> {
        self.count_read();
        let tables = self.inner.tables.read();
        Ok(tables
            .get(type_key)
            .and_then(|t| t.objects.get(object_id))
            .map(|cols| {
                cols.iter()
                    .map(|(c, v)| IndexRow::new(type_key, c.as_str(), v.as_str(), object_id.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn row_count(&self, type_key: &str) -> Result<u64> {
        self.count_read();
        Ok(self.inner.tables.read().get(type_key).map(TypeTable::row_count).unwrap_or(0))
    }
}

// ============================================================================
// Tests
// ============================================================================
