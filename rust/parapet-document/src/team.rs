use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{Action, Component, Principal, ResolverError, TeamId};

/// A team: direct principal members plus member teams. Membership is
/// recursive and the team graph may contain cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Identity of the team.
    pub id: TeamId,
    /// Principals that are direct members.
    #[serde(default)]
    pub users: Vec<Principal>,
    /// Teams whose members are members of this team.
    #[serde(default)]
    pub teams: Vec<TeamId>,
}

impl Team {
    /// A team without members.
    pub fn new(id: impl Into<TeamId>) -> Self {
        Self {
            id: id.into(),
            users: Vec::new(),
            teams: Vec::new(),
        }
    }

    /// Add a direct member, returning the team.
    pub fn user(mut self, principal: impl Into<Principal>) -> Self {
        self.users.push(principal.into());
        self
    }

    /// Add a member team, returning the team.
    pub fn team(mut self, team: impl Into<TeamId>) -> Self {
        self.teams.push(team.into());
        self
    }
}

/// An ACL entry embedded in a document: members of `team` hold `component`
/// for `action` on that document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// Team the grant applies to.
    pub team: TeamId,
    /// Action the grant applies to.
    pub action: Action,
    /// Component granted.
    pub component: Component,
}

/// Looks up teams by identity.
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    /// Fetch the team with identity `id`. A missing team is an error.
    async fn team(&self, id: &TeamId) -> Result<Team, ResolverError>;
}

#[async_trait]
impl<T> TeamDirectory for Arc<T>
where
    T: TeamDirectory + ?Sized,
{
    async fn team(&self, id: &TeamId) -> Result<Team, ResolverError> {
        self.as_ref().team(id).await
    }
}

#[async_trait]
impl<'a, T> TeamDirectory for &'a T
where
    T: TeamDirectory + ?Sized,
{
    async fn team(&self, id: &TeamId) -> Result<Team, ResolverError> {
        (**self).team(id).await
    }
}
