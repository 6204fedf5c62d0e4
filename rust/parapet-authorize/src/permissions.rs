use futures::future::try_join_all;
use parapet_document::{
    Action, Component, ComponentSet, Document, Principal, ResolverError, TeamDirectory,
};

use crate::{AuthorizeError, PrincipalSet, TeamExpander};

/// An ACL entry with its team expanded into member principals.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPermission {
    /// Principals holding the grant.
    pub principals: PrincipalSet,
    /// Action granted.
    pub action: Action,
    /// Component granted.
    pub component: Component,
}

/// Answers questions about the ACL entries embedded in a document.
pub struct Permissions<'a, D: ?Sized> {
    expander: TeamExpander<'a, D>,
}

impl<'a, D> Permissions<'a, D>
where
    D: TeamDirectory + ?Sized,
{
    /// Permissions whose teams are looked up in `directory`.
    pub fn new(directory: &'a D) -> Self {
        Self {
            expander: TeamExpander::new(directory),
        }
    }

    /// Every ACL entry of `document` with its team expanded, in entry order.
    pub async fn resolve_all(
        &self,
        document: &Document,
    ) -> Result<Vec<ResolvedPermission>, ResolverError> {
        try_join_all(document.acl().iter().map(|entry| async move {
            Ok::<_, ResolverError>(ResolvedPermission {
                principals: self.expander.expand(&entry.team).await?,
                action: entry.action.clone(),
                component: entry.component.clone(),
            })
        }))
        .await
    }

    /// Components the ACL of `document` grants to `principal` for `action`.
    pub async fn components(
        &self,
        document: &Document,
        principal: &Principal,
        action: &Action,
    ) -> Result<ComponentSet, ResolverError> {
        let granted = try_join_all(
            document
                .acl()
                .iter()
                .filter(|entry| &entry.action == action)
                .map(|entry| async move {
                    let members = self.expander.expand(&entry.team).await?;
                    Ok::<_, ResolverError>(
                        members
                            .contains(principal)
                            .then(|| entry.component.clone()),
                    )
                }),
        )
        .await?;

        Ok(granted.into_iter().flatten().collect())
    }

    /// Whether the ACL of `document` grants `component` for `action` to
    /// `principal`.
    pub async fn has(
        &self,
        document: &Document,
        principal: &Principal,
        action: &Action,
        component: &Component,
    ) -> Result<bool, ResolverError> {
        let matches = try_join_all(
            document
                .acl()
                .iter()
                .filter(|entry| &entry.action == action && &entry.component == component)
                .map(|entry| self.expander.expand(&entry.team)),
        )
        .await?;

        Ok(matches.iter().any(|members| members.contains(principal)))
    }

    /// Like [`Permissions::has`], but fails when the grant is missing.
    pub async fn assert(
        &self,
        document: &Document,
        principal: &Principal,
        action: &Action,
        component: &Component,
    ) -> Result<(), AuthorizeError> {
        if self.has(document, principal, action, component).await? {
            Ok(())
        } else {
            tracing::debug!(%principal, %action, %component, "ACL assertion failed");
            Err(AuthorizeError::MissingPermission {
                action: action.clone(),
                component: component.clone(),
            })
        }
    }
}
