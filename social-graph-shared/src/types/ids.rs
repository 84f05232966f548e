//! Identifier types for graph entities.
//!
//! Every node in the social graph is addressed by a stable string identifier.
//! Users receive theirs from the external identity provider; stories and
//! highlights get a UUID unless the caller supplies one (for retry-safe creation).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty (or only whitespace).
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Consume the wrapper and return the raw identifier.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a User node, issued by the identity provider.
    UserId
);

string_id!(
    /// Identifier of a Story node.
    StoryId
);

string_id!(
    /// Identifier of a Highlight node.
    HighlightId
);

impl StoryId {
    /// Allocate a fresh random story identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl HighlightId {
    /// Allocate a fresh random highlight identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}
