//! The document model consumed by the parapet authorization engine.
//!
//! A host supplies [`Document`]s, each bound to an immutable [`Schema`] that
//! describes its field tree and the [`ComponentSpec`] guarding every leaf.
//! Teams ([`Team`]) and the embedded [`AclEntry`] list of a document are the
//! raw material the engine turns into a [`ComponentSet`] for a given
//! principal and [`Action`].
//!
//! ```text
//! User (Schema)
//!   ├── name        Leaf("info")
//!   ├── settings    Object
//!   │     └── rememberMe  Leaf("settings")
//!   ├── emails      Array(Subdocument(Email))
//!   └── father      Reference("info")
//! ```
//!
//! [`MemoryStore`] is a trivial in-memory host useful for tests: it stores
//! documents and teams, implements [`TeamDirectory`] and populates
//! references.

mod error;
pub use error::*;

mod id;
pub use id::*;

mod path;
pub use path::*;

mod value;
pub use value::*;

mod component;
pub use component::*;

mod schema;
pub use schema::*;

mod document;
pub use document::*;

mod team;
pub use team::*;

mod store;
pub use store::*;
