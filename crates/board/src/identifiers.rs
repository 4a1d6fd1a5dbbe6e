//! Newtype domain identifiers.
//!
//! Every GitHub concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example, a
//! [`PullRequestId`] with a [`ProjectItemId`] even though both are opaque GraphQL
//! node ids under the hood. Unlinking a pull request from a board needs the
//! latter, and passing the former is a silent no-op on GitHub's side.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// The per-repository number of a pull request (`#42`).
    PullRequestNumber
}

u64_id! {
    /// The per-organization number of a Projects (v2) board.
    ProjectNumber
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single synchronization run (one invocation of the binary).
///
/// Generated fresh for every invocation and attached to the run span so all
/// activity from a single pass can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — GraphQL node ids
// ---------------------------------------------------------------------------

string_id! {
    /// GraphQL node id of a pull request (`PR_kwDO...`).
    PullRequestId
}

string_id! {
    /// GraphQL node id of a Projects (v2) board (`PVT_kwDO...`).
    ProjectId
}

string_id! {
    /// GraphQL node id of the board item linking a pull request to a board
    /// (`PVTI_lADO...`). Distinct from the pull request's own id.
    ProjectItemId
}

string_id! {
    /// GraphQL node id of a user account (`U_kgDO...`).
    UserId
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed (names)
// ---------------------------------------------------------------------------

string_id! {
    /// A GitHub account login: a user, an organization, or a repository owner.
    Login
}

string_id! {
    /// The slug of a team within an organization (e.g. `"platform-team"`).
    TeamSlug
}

string_id! {
    /// The name of a repository without its owner (e.g. `"prsync"`).
    RepositoryName
}
