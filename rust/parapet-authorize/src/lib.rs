//! Field-level authorization for hierarchical documents.
//!
//! Given a principal, an action and a [`Document`](parapet_document::Document),
//! this crate decides which parts of the document the principal may read and
//! whether (and how) the principal may write into it.
//!
//! Access is expressed in *components*: string tags that guard individual
//! fields. The [`ComponentResolver`] computes the components a principal
//! holds on a document for an action from three sources:
//!
//! - static defaults configured per document type in a [`Policy`],
//! - an optional caller-supplied [`ComponentPredicate`],
//! - ACL entries embedded in the document, whose teams are expanded into
//!   principals by the [`TeamExpander`].
//!
//! Reads go through the [`DocumentProjector`], which redacts a document into
//! the JSON tree the principal may see. Writes go through the
//! [`DocumentMutator`] (whole-document input) or [`Elements`] (one element of
//! a subdocument array at a time); both validate everything before touching
//! the document, so a failed write leaves it exactly as it was.
//!
//! Reference and team graphs may be cyclic. Walks over them are bounded by a
//! [`CycleGuard`] keyed on identity.
//!
//! Most callers only need the [`Authorizer`] facade.

mod error;
pub use error::*;

mod guard;
pub use guard::*;

mod team;
pub use team::*;

mod permissions;
pub use permissions::*;

mod policy;
pub use policy::*;

mod resolver;
pub use resolver::*;

mod project;
pub use project::*;

mod mutate;
pub use mutate::{DocumentMutator, WriteMode};

mod elements;
pub use elements::*;

mod authorizer;
pub use authorizer::*;
