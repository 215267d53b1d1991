//! The object store side of the engine.
//!
//! The engine never owns objects. It asks an [`ObjectSource`] for them when
//! backfilling, and callers use one to turn lookup results back into live
//! objects.

use std::collections::BTreeMap;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::Result;
use crate::events::ObjectEvent;
use crate::model::{Document, Indexable, ObjectId};

/// Read access to the external object store.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    type Object: Indexable + Send + Sync;

    /// Every object of a type, for backfill.
    async fn all_objects(&self, type_key: &str) -> Result<Vec<Self::Object>>;

    /// Live objects of `type_key` among `ids`, in `ids` order.
    ///
    /// Ids that no longer resolve are skipped, not reported as errors.
    async fn resolve(&self, type_key: &str, ids: &[ObjectId]) -> Result<Vec<Self::Object>>;
}

// ============================================================================
// MemoryObjectSource
// ============================================================================

/// In-memory document store for testing and embedding.
///
/// Mutations return the [`ObjectEvent`] the caller should dispatch once
/// the mutation is considered committed.
#[derive(Default)]
pub struct MemoryObjectSource {
    types: RwLock<HashMap<String, BTreeMap<ObjectId, Document>>>,
}

impl MemoryObjectSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document.
    pub fn save(&self, doc: Document) -> ObjectEvent<Document> {
        let type_key = doc.type_key.clone();
        let previous = self
            .types
            .write()
            .entry(type_key.clone())
            .or_default()
            .insert(doc.id.clone(), doc.clone());
        ObjectEvent::saved(type_key, doc, previous.is_none())
    }

    /// Remove a document. `None` when there was nothing to remove.
    pub fn delete(&self, type_key: &str, id: &ObjectId) -> Option<ObjectEvent<Document>> {
        let removed = self.types.write().get_mut(type_key)?.remove(id)?;
        Some(ObjectEvent::deleted(type_key, removed.id))
    }

    pub fn get(&self, type_key: &str, id: &ObjectId) -> Option<Document> {
        self.types.read().get(type_key)?.get(id).cloned()
    }

    pub fn len(&self, type_key: &str) -> usize {
        self.types.read().get(type_key).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self, type_key: &str) -> bool {
        self.len(type_key) == 0
    }
}

#[async_trait]
impl ObjectSource for MemoryObjectSource {
    type Object = Document;

    async fn all_objects(&self, type_key: &str) -> Result<Vec<Document>> {
        Ok(self
            .types
            .read()
            .get(type_key)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn resolve(&self, type_key: &str, ids: &[ObjectId]) -> Result<Vec<Document>> {
        let types = self.types.read();
        let Some(docs) = types.get(type_key) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| docs.get(id).cloned()).collect())
    }
}
