use indexmap::IndexMap;
use serde_json::Number;

use crate::{Document, DocumentId};

/// Insertion-ordered key/value map used for document fields and nested
/// objects.
pub type Record = IndexMap<String, Value>;

/// A value stored in (or written into) a [`Document`].
///
/// Untrusted write input is expressed with the same type; [`Value::Unset`]
/// only ever appears in input, where it requests removal of a field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence of a value. Assigning it removes the field.
    #[default]
    Unset,
    /// Explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// A JSON number.
    Number(Number),
    /// A string.
    String(String),
    /// An unpopulated reference to another document.
    Link(DocumentId),
    /// A nested key/value object.
    Object(Record),
    /// An ordered list of values.
    Array(Vec<Value>),
    /// An embedded subdocument, or a populated reference.
    Document(Box<Document>),
}

impl Value {
    /// Build an object from key/value pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// An unpopulated reference to `id`.
    pub fn link(id: impl Into<DocumentId>) -> Self {
        Self::Link(id.into())
    }

    /// Whether this is a JSON primitive (null, bool, number or string).
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_)
        )
    }

    /// Whether this is [`Value::Unset`].
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Borrow the nested record if this is an object.
    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Self::Object(record) => Some(record),
            _ => None,
        }
    }

    /// Borrow the elements if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the string if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the embedded document if this is one.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(document) => Some(document),
            _ => None,
        }
    }

    /// The JSON rendering of a primitive or a bare link. Composite values
    /// (objects, arrays, documents) and [`Value::Unset`] yield `None`: those
    /// are only ever rendered through an authorized projection.
    pub fn to_primitive_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Null => Some(serde_json::Value::Null),
            Self::Bool(value) => Some(serde_json::Value::Bool(*value)),
            Self::Number(value) => Some(serde_json::Value::Number(value.clone())),
            Self::String(value) => Some(serde_json::Value::String(value.clone())),
            Self::Link(id) => Some(serde_json::Value::String(id.to_string())),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Bool(value),
            serde_json::Value::Number(value) => Self::Number(value),
            serde_json::Value::String(value) => Self::String(value),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Self::Document(Box::new(value))
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(value: Vec<V>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}
