//! Equality predicates used as lookup input.

use smallvec::SmallVec;

use super::Value;

/// A single `column = value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { column: column.into(), value: value.into() }
    }
}

/// Predicates combined with logical AND. Most lookups carry one or two.
pub type Predicates = SmallVec<[Predicate; 4]>;

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for Predicate {
    fn from((column, value): (K, V)) -> Self {
        Predicate::new(column, value)
    }
}
