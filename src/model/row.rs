//! IndexRow - one (type, column, value) → object mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ObjectId;

/// A denormalized index record.
///
/// At most one row exists per `(type_key, object_id, column)`, which also
/// makes `(type_key, column, value, object_id)` unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexRow {
    pub type_key: String,
    pub column: String,
    pub value: String,
    pub object_id: ObjectId,
}

impl IndexRow {
    pub fn new(
        type_key: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<String>,
        object_id: impl Into<ObjectId>,
    ) -> Self {
        Self {
            type_key: type_key.into(),
            column: column.into(),
            value: value.into(),
            object_id: object_id.into(),
        }
    }
}

impl fmt::Display for IndexRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={} in {} where id is {}",
            self.column, self.value, self.type_key, self.object_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let row = IndexRow::new("crm:person", "name", "Ada", 7u64);
        assert_eq!(row.to_string(), "name=Ada in crm:person where id is 7");
    }
}
