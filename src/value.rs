//! The response-shaped [`Value`] the completion algorithm builds up, and
//! the ordered [`Object`] map it uses for object fields.
//!
//! Grounded on `juniper::value::{Value, Object}`: a scalar/list/object tree
//! similar to JSON, but — per the teacher's own doc comment — without enum
//! or variable variants, since those only make sense for AST literals
//! (see [`crate::ast::Value`]), not for values resolvers produce.

use std::fmt;

use indexmap::map::IndexMap;

/// A scalar leaf value, as produced by [`serialize`](crate::schema::meta::ScalarType::serialize).
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Boolean.
    Boolean(bool),
    /// 32-bit integer, GraphQL's `Int`.
    Int(i32),
    /// Double-precision float, GraphQL's `Float`.
    Float(f64),
    /// UTF-8 string, GraphQL's `String`/`ID`/enum serialization.
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// The response value tree: what ends up under `data` in the execution
/// result.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `null`.
    Null,
    /// A serialized scalar leaf.
    Scalar(Scalar),
    /// An ordered list of completed values.
    List(Vec<Value>),
    /// An ordered object of completed fields.
    Object(Object),
}

impl Value {
    /// Constructs a null value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Whether this value is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrows the object map, if this is an object value.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Self::Object(o)
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

/// An ordered response object: response-name → completed [`Value`].
///
/// Backed by an [`IndexMap`] rather than a [`std::collections::HashMap`]
/// because §8's response-key-ordering invariant requires the
/// first-encounter order of the [`crate::collect`] field collector to
/// survive into the final response, not just any stable order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Object {
    fields: IndexMap<String, Value>,
}

impl Object {
    /// An empty object with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: IndexMap::with_capacity(capacity) }
    }

    /// Inserts `value` under `key`, preserving first-encounter order: a
    /// key seen before keeps its original position even when overwritten.
    ///
    /// Per C6 "do not overwrite an already-present key": callers are
    /// expected to check [`Self::contains_key`] themselves before a
    /// top-level field result; this method is the low-level building
    /// block used once that decision has been made.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Whether `key` has already been recorded.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Looks up a field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}
