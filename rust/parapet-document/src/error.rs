use thiserror::Error;

use crate::{FieldPath, TeamId};

/// Errors raised when traversing or assigning document paths.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// A path tried to descend through a value that is not an object.
    #[error("Value at '{0}' is not an object")]
    NotAnObject(FieldPath),

    /// The document root itself cannot be assigned.
    #[error("Cannot assign the document root")]
    RootAssignment,
}

/// Failure of an external permission source: a predicate, a computed
/// component or a team lookup. Aborts the whole call it occurs in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    /// A caller-supplied predicate failed.
    #[error("Permission predicate failed: {0}")]
    Predicate(String),

    /// A computed component could not be resolved.
    #[error("Component resolution failed: {0}")]
    Component(String),

    /// A team reference does not resolve to a team.
    #[error("Unknown team '{0}'")]
    UnknownTeam(TeamId),

    /// The team directory failed.
    #[error("Team lookup for '{team}' failed: {reason}")]
    TeamLookup {
        /// Team being looked up.
        team: TeamId,
        /// Description of the failure.
        reason: String,
    },
}
