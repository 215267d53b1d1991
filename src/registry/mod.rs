//! Index registry: which columns are indexed for which object types.
//!
//! Lives in memory and is owned by the [`Indexer`](crate::Indexer). Nothing
//! here is persisted; a restarted process must register its columns again
//! before lifecycle events or lookups reach it.

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;

use crate::model::ColumnPath;

/// Outcome of a [`IndexRegistry::register`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// The column was not registered before this call.
    pub newly_added: bool,
    /// This call created the type's lifecycle subscription.
    pub subscribed: bool,
}

/// Per-type sets of registered columns plus the set of types whose
/// lifecycle events the maintainer listens to.
#[derive(Default)]
pub struct IndexRegistry {
    columns: RwLock<HashMap<String, BTreeSet<ColumnPath>>>,
    subscriptions: RwLock<HashSet<String>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column for a type. Idempotent.
    ///
    /// The first registration for a type also subscribes to its lifecycle
    /// events; later ones leave the subscription alone.
    pub fn register(&self, type_key: &str, column: ColumnPath) -> Registration {
        let newly_added = self
            .columns
            .write()
            .entry(type_key.to_owned())
            .or_default()
            .insert(column);
        let subscribed = self.subscriptions.write().insert(type_key.to_owned());
        Registration { newly_added, subscribed }
    }

    /// Remove a column. The type stays subscribed.
    pub fn unregister(&self, type_key: &str, column: &str) -> bool {
        let mut columns = self.columns.write();
        let Some(set) = columns.get_mut(type_key) else {
            return false;
        };
        let before = set.len();
        set.retain(|c| c.as_str() != column);
        before != set.len()
    }

    pub fn is_registered(&self, type_key: &str, column: &str) -> bool {
        self.columns
            .read()
            .get(type_key)
            .is_some_and(|set| set.iter().any(|c| c.as_str() == column))
    }

    /// Registered columns for a type, in name order.
    pub fn columns(&self, type_key: &str) -> Vec<ColumnPath> {
        self.columns
            .read()
            .get(type_key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, type_key: &str) -> bool {
        self.subscriptions.read().contains(type_key)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Types with at least one registered column, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .columns
            .read()
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(t, _)| t.clone())
            .collect();
        types.sort();
        types
    }
}
