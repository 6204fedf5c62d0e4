//! Static, per-document-type description of field paths.
//!
//! A [`Schema`] is a tree of [`SchemaNode`]s whose kind is decided once at
//! declaration time. Schemas are immutable and shared behind [`Arc`]s by every
//! [`Document`] of that type.

use indexmap::IndexMap;
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

use crate::{ComponentSpec, Document, FieldPath, Value};

/// Named children of an object node, in declaration order.
pub type Fields = IndexMap<String, SchemaNode>;

/// Computes a virtual field from its document.
pub type Getter = Arc<dyn Fn(&Document) -> Value + Send + Sync>;

/// Schema of one document type.
#[derive(Debug)]
pub struct Schema {
    name: String,
    fields: Fields,
}

impl Schema {
    /// Start declaring a schema named `name`.
    pub fn build(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Fields::new(),
        }
    }

    /// Name of the document type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-level fields in declaration order.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Look up the node at `path`, descending through nested objects only.
    pub fn node(&self, path: &FieldPath) -> Option<&SchemaNode> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = self.fields.get(first)?;
        for segment in rest {
            match node {
                SchemaNode::Object(children) => node = children.get(segment)?,
                _ => return None,
            }
        }
        Some(node)
    }

    /// Every non-object path of this schema (nested objects are descended
    /// into), in declaration order.
    pub fn terminal_paths(&self) -> Vec<(FieldPath, &SchemaNode)> {
        fn collect<'a>(
            fields: &'a Fields,
            prefix: &FieldPath,
            paths: &mut Vec<(FieldPath, &'a SchemaNode)>,
        ) {
            for (name, node) in fields {
                let path = prefix.child(name);
                match node {
                    SchemaNode::Object(children) => collect(children, &path, paths),
                    _ => paths.push((path, node)),
                }
            }
        }

        let mut paths = Vec::new();
        collect(&self.fields, &FieldPath::root(), &mut paths);
        paths
    }
}

/// Incrementally declares a [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Fields,
}

impl SchemaBuilder {
    /// Declare a top-level field.
    pub fn field(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        self.fields.insert(name.into(), node);
        self
    }

    /// Finish the declaration.
    pub fn finish(self) -> Arc<Schema> {
        Arc::new(Schema {
            name: self.name,
            fields: self.fields,
        })
    }
}

/// Kind of a schema path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single primitive value.
    Leaf,
    /// A plain object of further fields.
    Nested,
    /// An array of primitive values.
    LeafArray,
    /// An identifier of another document.
    Reference,
    /// An array of identifiers of other documents.
    ReferenceArray,
    /// A single embedded document.
    Subdocument,
    /// An array of embedded documents with their own identities.
    SubdocumentArray,
    /// A read-only value derived from the document.
    Virtual,
}

/// One node of a schema tree.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// A nested object with named children.
    Object(Fields),
    /// A primitive value.
    Leaf(ComponentSpec),
    /// A reference to another document, stored either as a bare id or
    /// populated with the referenced document.
    Reference(ComponentSpec),
    /// A computed field without backing storage.
    Virtual(VirtualField),
    /// A list whose elements are described by the inner node.
    Array(Box<SchemaNode>),
    /// An embedded subdocument, authorized as a document of its own.
    Subdocument(Embedded),
}

impl SchemaNode {
    /// A primitive field guarded by `spec`.
    pub fn leaf(spec: impl Into<ComponentSpec>) -> Self {
        Self::Leaf(spec.into())
    }

    /// A primitive field no component unlocks.
    pub fn hidden() -> Self {
        Self::Leaf(ComponentSpec::Unassigned)
    }

    /// A reference field guarded by `spec`.
    pub fn reference(spec: impl Into<ComponentSpec>) -> Self {
        Self::Reference(spec.into())
    }

    /// A list of `element`s.
    pub fn array(element: SchemaNode) -> Self {
        Self::Array(Box::new(element))
    }

    /// A list of embedded subdocuments of type `schema`; `spec` gates
    /// element insertion and removal.
    pub fn subdocuments(schema: Arc<Schema>, spec: impl Into<ComponentSpec>) -> Self {
        Self::array(Self::Subdocument(Embedded {
            schema,
            spec: spec.into(),
        }))
    }

    /// A nested object with the given children.
    pub fn object<K, I>(children: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, SchemaNode)>,
    {
        Self::Object(
            children
                .into_iter()
                .map(|(name, node)| (name.into(), node))
                .collect(),
        )
    }

    /// A virtual field computed by `getter`.
    pub fn computed<F>(spec: impl Into<ComponentSpec>, getter: F) -> Self
    where
        F: Fn(&Document) -> Value + Send + Sync + 'static,
    {
        Self::Virtual(VirtualField {
            spec: spec.into(),
            getter: Arc::new(getter),
        })
    }

    /// Kind of the path this node describes.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Object(_) => FieldKind::Nested,
            Self::Leaf(_) => FieldKind::Leaf,
            Self::Reference(_) => FieldKind::Reference,
            Self::Virtual(_) => FieldKind::Virtual,
            Self::Subdocument(_) => FieldKind::Subdocument,
            Self::Array(element) => match element.as_ref() {
                Self::Subdocument(_) => FieldKind::SubdocumentArray,
                Self::Reference(_) => FieldKind::ReferenceArray,
                _ => FieldKind::LeafArray,
            },
        }
    }

    /// The embedded element description if this is a list of subdocuments.
    pub fn embedded(&self) -> Option<&Embedded> {
        match self {
            Self::Array(element) => match element.as_ref() {
                Self::Subdocument(embedded) => Some(embedded),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Element description of a subdocument list.
#[derive(Debug, Clone)]
pub struct Embedded {
    /// Schema of each element.
    pub schema: Arc<Schema>,
    /// Component required on the enclosing document to add or remove
    /// elements.
    pub spec: ComponentSpec,
}

/// A field computed from its document rather than stored.
#[derive(Clone)]
pub struct VirtualField {
    /// Component guarding the computed value.
    pub spec: ComponentSpec,
    getter: Getter,
}

impl VirtualField {
    /// Compute the value for `document`.
    pub fn compute(&self, document: &Document) -> Value {
        (self.getter)(document)
    }
}

impl Debug for VirtualField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualField")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}
