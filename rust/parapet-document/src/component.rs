use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Debug, Display, Formatter},
    sync::Arc,
};

use crate::{Document, ResolverError};

/// Operation category selecting which component set applies. The set of
/// actions is open: `read` and `write` are used by the engine itself, hosts
/// may grant anything else through ACL entries or predicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    /// Name of the read action.
    pub const READ: &'static str = "read";
    /// Name of the write action.
    pub const WRITE: &'static str = "write";

    /// Create an arbitrary action.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The action consulted when projecting a document.
    pub fn read() -> Self {
        Self::new(Self::READ)
    }

    /// The action consulted when mutating a document.
    pub fn write() -> Self {
        Self::new(Self::WRITE)
    }

    /// Name of this action.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A capability tag gating read or write access to a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Component(String);

impl Component {
    /// Create a component tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name of this component.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Component {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Component {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Deduplicated set of [`Component`]s a principal holds for a given document
/// and action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentSet(BTreeSet<Component>);

impl ComponentSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set holds `component`.
    pub fn contains(&self, component: &Component) -> bool {
        self.0.contains(component)
    }

    /// Add a component, returning whether it was newly inserted.
    pub fn insert(&mut self, component: impl Into<Component>) -> bool {
        self.0.insert(component.into())
    }

    /// Union `other` into this set.
    pub fn merge(&mut self, other: ComponentSet) {
        self.0.extend(other.0);
    }

    /// Number of distinct components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate components in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.0.iter()
    }
}

impl<C: Into<Component>> FromIterator<C> for ComponentSet {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<C: Into<Component>> Extend<C> for ComponentSet {
    fn extend<I: IntoIterator<Item = C>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for ComponentSet {
    type Item = Component;
    type IntoIter = std::collections::btree_set::IntoIter<Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Computes the component guarding a field from the document instance the
/// field belongs to. Implementations may perform I/O.
///
/// Any `Fn(&Document) -> Option<Component>` closure is a `ComponentFn`.
#[async_trait]
pub trait ComponentFn: Send + Sync {
    /// Resolve the component for `document`, or `None` when the field is
    /// guarded by nothing (and is therefore inaccessible).
    async fn component(&self, document: &Document) -> Result<Option<Component>, ResolverError>;
}

#[async_trait]
impl<F> ComponentFn for F
where
    F: Fn(&Document) -> Option<Component> + Send + Sync,
{
    async fn component(&self, document: &Document) -> Result<Option<Component>, ResolverError> {
        Ok(self(document))
    }
}

/// How the component guarding a field is determined. Decided once when the
/// schema is declared and resolved per document instance.
#[derive(Clone, Default)]
pub enum ComponentSpec {
    /// The field carries no component and can never be read or written.
    #[default]
    Unassigned,
    /// The field is guarded by a fixed component.
    Static(Component),
    /// The component depends on the document instance.
    Computed(Arc<dyn ComponentFn>),
}

impl ComponentSpec {
    /// A spec computed from the document instance.
    pub fn computed<F>(function: F) -> Self
    where
        F: ComponentFn + 'static,
    {
        Self::Computed(Arc::new(function))
    }

    /// Resolve this spec against a concrete document.
    pub async fn resolve(&self, document: &Document) -> Result<Option<Component>, ResolverError> {
        match self {
            Self::Unassigned => Ok(None),
            Self::Static(component) => Ok(Some(component.clone())),
            Self::Computed(function) => function.component(document).await,
        }
    }

    /// Resolve this spec and test the result against `components`.
    pub async fn permits(
        &self,
        document: &Document,
        components: &ComponentSet,
    ) -> Result<bool, ResolverError> {
        Ok(self
            .resolve(document)
            .await?
            .is_some_and(|component| components.contains(&component)))
    }
}

impl Debug for ComponentSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unassigned => f.write_str("Unassigned"),
            Self::Static(component) => f.debug_tuple("Static").field(component).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for ComponentSpec {
    fn from(value: &str) -> Self {
        Self::Static(Component::new(value))
    }
}

impl From<Component> for ComponentSpec {
    fn from(value: Component) -> Self {
        Self::Static(value)
    }
}
