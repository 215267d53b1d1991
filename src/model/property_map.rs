//! PropertyMap - the key-value bag on documents and nested map values.

use std::collections::HashMap;
use super::Value;

/// A map of property names to values.
pub type PropertyMap = HashMap<String, Value>;
