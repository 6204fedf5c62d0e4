use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap the given string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// The underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier! {
    /// Stable identity of a [`Document`](crate::Document), including embedded
    /// subdocuments. Cycle detection keys on this value.
    DocumentId
}

identifier! {
    /// Identity of a [`Team`](crate::Team).
    TeamId
}

identifier! {
    /// Opaque identifier of an acting user.
    Principal
}

impl DocumentId {
    /// Generate a fresh, lexicographically sortable identity.
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}
