//! Object lifecycle events pushed into the engine.
//!
//! The object store (or whatever bus fronts it) builds one event per
//! committed create, update, or delete, after the mutation is durable, and
//! hands it to [`Indexer::dispatch`](crate::Indexer::dispatch). Saved events
//! carry the post-mutation object.

use crate::maintain::SaveSummary;
use crate::model::{Indexable, ObjectId};

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEvent<O> {
    Saved { type_key: String, object: O, is_new: bool },
    Deleted { type_key: String, object_id: ObjectId },
}

impl<O: Indexable> ObjectEvent<O> {
    pub fn saved(type_key: impl Into<String>, object: O, is_new: bool) -> Self {
        ObjectEvent::Saved { type_key: type_key.into(), object, is_new }
    }

    pub fn deleted(type_key: impl Into<String>, object_id: impl Into<ObjectId>) -> Self {
        ObjectEvent::Deleted { type_key: type_key.into(), object_id: object_id.into() }
    }

    pub fn type_key(&self) -> &str {
        match self {
            ObjectEvent::Saved { type_key, .. } | ObjectEvent::Deleted { type_key, .. } => type_key,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        match self {
            ObjectEvent::Saved { object, .. } => object.object_id(),
            ObjectEvent::Deleted { object_id, .. } => object_id.clone(),
        }
    }
}

/// What [`Indexer::dispatch`](crate::Indexer::dispatch) did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing is subscribed to the event's type.
    Ignored,
    Saved(SaveSummary),
    /// Number of index rows removed.
    Deleted(usize),
}
