use async_trait::async_trait;
use parapet_document::{Action, Component, ComponentSet, Document, Principal, ResolverError};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
    sync::Arc,
};

/// Caller-supplied source of components for a (document, principal, action)
/// triple. Implementations may perform I/O; a failure aborts resolution.
///
/// Any `Fn(&Document, &Principal, &Action) -> Result<ComponentSet, ResolverError>`
/// closure is a `ComponentPredicate`.
#[async_trait]
pub trait ComponentPredicate: Send + Sync {
    /// Components `principal` holds on `document` for `action`.
    async fn components(
        &self,
        document: &Document,
        principal: &Principal,
        action: &Action,
    ) -> Result<ComponentSet, ResolverError>;
}

#[async_trait]
impl<F> ComponentPredicate for F
where
    F: Fn(&Document, &Principal, &Action) -> Result<ComponentSet, ResolverError> + Send + Sync,
{
    async fn components(
        &self,
        document: &Document,
        principal: &Principal,
        action: &Action,
    ) -> Result<ComponentSet, ResolverError> {
        self(document, principal, action)
    }
}

/// Resolver configuration for one document type.
///
/// The serializable part can be loaded from configuration:
///
/// ```json
/// { "defaults": { "read": ["info", "contactVisible"] }, "acl": true }
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Policy {
    defaults: HashMap<Action, ComponentSet>,
    acl: bool,
    #[serde(skip)]
    predicate: Option<Arc<dyn ComponentPredicate>>,
}

impl Policy {
    /// A policy with no defaults and no predicate that consults embedded ACL
    /// entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `components` to everyone for `action`.
    pub fn with_defaults<C, I>(mut self, action: impl Into<Action>, components: I) -> Self
    where
        C: Into<Component>,
        I: IntoIterator<Item = C>,
    {
        self.defaults
            .entry(action.into())
            .or_default()
            .extend(components);
        self
    }

    /// Consult `predicate` on every resolution.
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: ComponentPredicate + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Ignore ACL entries embedded in documents.
    pub fn without_acl(mut self) -> Self {
        self.acl = false;
        self
    }

    /// Components everyone holds for `action`.
    pub fn defaults(&self, action: &Action) -> Option<&ComponentSet> {
        self.defaults.get(action)
    }

    /// The caller-supplied predicate, if any.
    pub fn predicate(&self) -> Option<&dyn ComponentPredicate> {
        self.predicate.as_deref()
    }

    /// Whether embedded ACL entries contribute components.
    pub fn consults_acl(&self) -> bool {
        self.acl
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            defaults: HashMap::new(),
            acl: true,
            predicate: None,
        }
    }
}

impl Debug for Policy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Policy")
            .field("defaults", &self.defaults)
            .field("acl", &self.acl)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// [`Policy`] per schema name. Documents whose type has no entry resolve
/// with [`Policy::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Policies(HashMap<String, Policy>);

impl Policies {
    /// No policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `policy` for documents of schema `name`.
    pub fn insert(&mut self, name: impl Into<String>, policy: Policy) -> Option<Policy> {
        self.0.insert(name.into(), policy)
    }

    /// Policy registered for schema `name`.
    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.0.get(name)
    }

    /// Mutable access to the policy registered for `name`, e.g. to attach a
    /// predicate after loading from configuration.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Policy> {
        self.0.get_mut(name)
    }
}

/// Projection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name of the field carrying a document's identity in projections.
    pub identity_field: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            identity_field: "_id".into(),
        }
    }
}
