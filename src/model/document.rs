//! Document - a generic property-bag object.

use serde::{Deserialize, Serialize};

use super::{Indexable, ObjectId, PropertyMap, Value};

/// A schemaless object: an identifier, its type key, and properties.
///
/// Handy for stores that already speak JSON, and what
/// [`MemoryObjectSource`](crate::source::MemoryObjectSource) holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: ObjectId,
    pub type_key: String,
    pub properties: PropertyMap,
}

impl Document {
    pub fn new(type_key: impl Into<String>, id: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            type_key: type_key.into(),
            properties: PropertyMap::new(),
        }
    }

    /// Build from a JSON object. Non-object JSON yields no properties.
    pub fn from_json(
        type_key: impl Into<String>,
        id: impl Into<ObjectId>,
        json: serde_json::Value,
    ) -> Self {
        let properties = match Value::from(json) {
            Value::Map(m) => m,
            _ => PropertyMap::new(),
        };
        Self { id: id.into(), type_key: type_key.into(), properties }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl Indexable for Document {
    fn object_id(&self) -> ObjectId { self.id.clone() }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.properties.get(name).cloned()
    }
}
