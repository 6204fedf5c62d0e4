use parapet_document::{
    Action, ComponentSet, Document, FieldPath, Principal, ResolverError, TeamDirectory, TeamId,
    Value,
};
use serde_json::Value as Json;

use crate::{
    AuthorizeError, ComponentResolver, DocumentMutator, DocumentProjector, Elements, Permissions,
    Policies, Policy, PrincipalSet, Settings, TeamExpander, WriteMode,
};

/// [`Authorizer`] is the entry point for every principal-scoped operation:
/// component resolution, reads, whole-document writes and element-wise
/// changes to subdocument arrays.
///
/// It owns the [`TeamDirectory`] used to expand ACL teams together with the
/// per-type [`Policies`] and projection [`Settings`]. Nothing is cached
/// between calls; every operation resolves components afresh.
///
/// ```no_run
/// # use parapet_authorize::{Authorizer, Policy};
/// # use parapet_document::{Document, MemoryStore, Schema, SchemaNode};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Schema::build("User")
///     .field("name", SchemaNode::leaf("info"))
///     .finish();
/// let luke = Document::new("luke", schema).with("name", "Luke");
///
/// let authorizer = Authorizer::new(MemoryStore::new())
///     .with_policy("User", Policy::new().with_defaults("read", ["info"]));
///
/// let projection = authorizer.project(&luke, &"han".into()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Authorizer<D> {
    directory: D,
    policies: Policies,
    settings: Settings,
}

impl<D> Authorizer<D>
where
    D: TeamDirectory,
{
    /// An authorizer expanding teams via `directory`, with no policies and
    /// default settings.
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            policies: Policies::new(),
            settings: Settings::default(),
        }
    }

    /// Register `policy` for documents of schema `name`.
    pub fn with_policy(mut self, name: impl Into<String>, policy: Policy) -> Self {
        self.policies.insert(name, policy);
        self
    }

    /// Replace all policies.
    pub fn with_policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    /// Replace the projection settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// The team directory used to expand ACL entries.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// The configured per-type policies.
    pub fn policies(&self) -> &Policies {
        &self.policies
    }

    /// The projection settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// A component resolver over this authorizer's directory and policies.
    pub fn resolver(&self) -> ComponentResolver<'_, D> {
        ComponentResolver::new(&self.directory, &self.policies)
    }

    /// A team expander over the directory.
    pub fn expander(&self) -> TeamExpander<'_, D> {
        TeamExpander::new(&self.directory)
    }

    /// ACL queries over the directory.
    pub fn permissions(&self) -> Permissions<'_, D> {
        Permissions::new(&self.directory)
    }

    /// Components `principal` holds on `document` for `action`.
    pub async fn resolve_components(
        &self,
        document: &Document,
        principal: &Principal,
        action: &Action,
    ) -> Result<ComponentSet, ResolverError> {
        self.resolver().resolve(document, principal, action).await
    }

    /// Every principal that is a member of `team`.
    pub async fn expand_users(&self, team: &TeamId) -> Result<PrincipalSet, ResolverError> {
        self.expander().expand(team).await
    }

    /// The part of `document` `principal` may read, or `None` when nothing
    /// is readable.
    pub async fn project(
        &self,
        document: &Document,
        principal: &Principal,
    ) -> Result<Option<Json>, ResolverError> {
        DocumentProjector::new(self.resolver(), &self.settings)
            .project(document, principal)
            .await
    }

    /// Write `input` into `document` on behalf of `principal`, all or
    /// nothing.
    pub async fn authorize_write(
        &self,
        document: &mut Document,
        principal: &Principal,
        input: &Value,
        mode: WriteMode,
    ) -> Result<(), AuthorizeError> {
        DocumentMutator::new(self.resolver())
            .write(document, principal, input, mode)
            .await
    }

    /// Element-wise access to the subdocument array at `path`.
    pub fn elements<'a>(
        &'a self,
        document: &'a mut Document,
        path: impl Into<FieldPath>,
    ) -> Result<Elements<'a, D>, AuthorizeError> {
        Elements::new(self.resolver(), document, path.into())
    }
}
