//! The capability contract indexed objects implement.

use super::{ColumnPath, ObjectId, Value};

/// An object the index can read attributes from.
///
/// Implemented per object type by the owning store. `attribute` is only
/// ever asked for the first segment of a column path; deeper segments are
/// walked through [`Value::get`].
pub trait Indexable {
    fn object_id(&self) -> ObjectId;

    /// Top-level attribute by name. `None` when the object has no such
    /// attribute.
    fn attribute(&self, name: &str) -> Option<Value>;
}

impl<T: Indexable + ?Sized> Indexable for &T {
    fn object_id(&self) -> ObjectId { (**self).object_id() }
    fn attribute(&self, name: &str) -> Option<Value> { (**self).attribute(name) }
}

/// Resolve a column path against an object.
///
/// Returns `None` when any segment is missing or when the final value is
/// empty.
pub fn resolve_path<O: Indexable + ?Sized>(object: &O, column: &ColumnPath) -> Option<Value> {
    let mut value = object.attribute(column.head())?;
    for segment in column.tail() {
        value = value.get(segment)?.clone();
    }
    if value.is_empty() { None } else { Some(value) }
}
