use parapet_document::{Action, Component, DocumentId, FieldPath, ResolverError};
use thiserror::Error;

/// Errors surfaced by write operations and permission assertions.
///
/// Read-path denial is never an error: unreadable fields are omitted from
/// projections instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthorizeError {
    /// A predicate, computed component or team lookup failed.
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Input does not fit the schema: a non-object where an object is
    /// expected, an unknown path, or a path that cannot be assigned directly.
    #[error("Schema violation at '{path}': {reason}")]
    SchemaViolation {
        /// Path of the offending input.
        path: FieldPath,
        /// What was wrong with it.
        reason: String,
    },

    /// The principal does not hold the component guarding a written path.
    #[error("Permission denied: not allowed to write '{0}'")]
    PermissionDenied(FieldPath),

    /// An array element with the given id does not exist.
    #[error("No element '{id}' in '{path}'")]
    NotFound {
        /// Path of the subdocument array.
        path: FieldPath,
        /// Identity that was looked up.
        id: DocumentId,
    },

    /// An ACL assertion failed.
    #[error("Permission denied: '{component}' is not granted for '{action}'")]
    MissingPermission {
        /// Action that was asserted.
        action: Action,
        /// Component that was asserted.
        component: Component,
    },
}

impl AuthorizeError {
    pub(crate) fn violation(path: &FieldPath, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Re-anchor the path carried by this error under `prefix`.
    pub(crate) fn within(self, prefix: &FieldPath) -> Self {
        match self {
            Self::SchemaViolation { path, reason } => Self::SchemaViolation {
                path: prefix.join(&path),
                reason,
            },
            Self::PermissionDenied(path) => Self::PermissionDenied(prefix.join(&path)),
            other => other,
        }
    }
}
