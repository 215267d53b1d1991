//! # Index Model
//!
//! Plain data that crosses every boundary: object store ↔ maintainer ↔
//! index store ↔ lookup ↔ caller.
//!
//! This module is pure data: no I/O or async.

pub mod column;
pub mod document;
pub mod object;
pub mod object_id;
pub mod predicate;
pub mod property_map;
pub mod row;
pub mod value;

pub use column::{ColumnPath, validate_type_key};
pub use document::Document;
pub use object::{Indexable, resolve_path};
pub use object_id::ObjectId;
pub use predicate::{Predicate, Predicates};
pub use property_map::PropertyMap;
pub use row::IndexRow;
pub use value::Value;
