use parapet_document::{Action, ComponentSet, Document, Principal, ResolverError, TeamDirectory};

use crate::{Permissions, Policies};

/// Computes the components a principal holds on a document for an action.
///
/// The result is the union of three sources:
///
/// 1. the policy's static defaults for the action,
/// 2. the policy's predicate, if any,
/// 3. the document's embedded ACL entries, whose teams are expanded.
///
/// Sources 2 and 3 are evaluated concurrently. A failure of either aborts
/// resolution; no partial set is returned. Results are never cached.
pub struct ComponentResolver<'a, D: ?Sized> {
    directory: &'a D,
    policies: &'a Policies,
}

impl<'a, D> ComponentResolver<'a, D>
where
    D: TeamDirectory + ?Sized,
{
    /// A resolver consulting `policies`, expanding teams via `directory`.
    pub fn new(directory: &'a D, policies: &'a Policies) -> Self {
        Self {
            directory,
            policies,
        }
    }

    /// Components `principal` holds on `document` for `action`.
    pub async fn resolve(
        &self,
        document: &Document,
        principal: &Principal,
        action: &Action,
    ) -> Result<ComponentSet, ResolverError> {
        let policy = self.policies.get(document.schema().name());
        let consults_acl = policy.is_none_or(|policy| policy.consults_acl());

        let from_predicate = async {
            match policy.and_then(|policy| policy.predicate()) {
                Some(predicate) => predicate.components(document, principal, action).await,
                None => Ok(ComponentSet::new()),
            }
        };
        let from_acl = async {
            if consults_acl {
                Permissions::new(self.directory)
                    .components(document, principal, action)
                    .await
            } else {
                Ok(ComponentSet::new())
            }
        };

        let (predicated, granted) =
            tokio::try_join!(from_predicate, from_acl).inspect_err(|error| {
                tracing::debug!(id = %document.id(), %principal, %action, %error, "Component resolution failed");
            })?;

        let mut components = policy
            .and_then(|policy| policy.defaults(action))
            .cloned()
            .unwrap_or_default();
        components.merge(predicated);
        components.merge(granted);

        tracing::trace!(id = %document.id(), %principal, %action, ?components, "Resolved components");
        Ok(components)
    }
}
