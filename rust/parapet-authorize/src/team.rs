use futures::{
    FutureExt,
    future::{BoxFuture, try_join_all},
};
use indexmap::IndexSet;
use parapet_document::{Principal, ResolverError, TeamDirectory, TeamId};

use crate::CycleGuard;

/// Deduplicated principals in discovery order.
pub type PrincipalSet = IndexSet<Principal>;

/// Resolves a team into the flat set of principals that are its members,
/// directly or through member teams. Cyclic team graphs terminate: a team
/// already on the current path contributes nothing.
pub struct TeamExpander<'a, D: ?Sized> {
    directory: &'a D,
}

impl<'a, D> TeamExpander<'a, D>
where
    D: TeamDirectory + ?Sized,
{
    /// An expander looking teams up in `directory`.
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Every principal that is a member of `team`.
    pub async fn expand(&self, team: &TeamId) -> Result<PrincipalSet, ResolverError> {
        self.expand_within(team.clone(), CycleGuard::new()).await
    }

    /// Expand `team` on a path that has already visited the teams in
    /// `visited`. Member teams are expanded concurrently, each on its own
    /// copy of the path.
    pub fn expand_within(
        &self,
        team: TeamId,
        visited: CycleGuard<TeamId>,
    ) -> BoxFuture<'_, Result<PrincipalSet, ResolverError>> {
        async move {
            if visited.contains(&team) {
                tracing::trace!(%team, "Team already expanded on this path");
                return Ok(PrincipalSet::new());
            }
            let visited = visited.with(team.clone());

            let record = self.directory.team(&team).await.inspect_err(|error| {
                tracing::debug!(%team, %error, "Team lookup failed");
            })?;

            let nested = try_join_all(
                record
                    .teams
                    .iter()
                    .map(|child| self.expand_within(child.clone(), visited.clone())),
            )
            .await?;

            let mut members: PrincipalSet = record.users.into_iter().collect();
            members.extend(nested.into_iter().flatten());
            Ok(members)
        }
        .boxed()
    }
}
