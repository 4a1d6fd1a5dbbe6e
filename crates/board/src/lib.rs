//! Core domain for prsync: keeping a Projects (v2) board's pull-request list in
//! step with a roster of contributors.
//!
//! This crate contains every domain concept, newtype identifier, and error type,
//! plus the two engines that carry the logic: roster membership resolution
//! ([`authors`]) and board reconciliation ([`reconcile`]). Infrastructure crates
//! implement [`RepositoryService`]; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; the `github` crate defines *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`Login`, `PullRequestId`, `ProjectItemId`, etc.) |
//! | [`types`] | Snapshot value types (`PullRequest`, `Project`, `ProjectKey`, etc.) |
//! | [`errors`] | `ServiceError` and `SyncError` |
//! | [`rules`] | Roster and add/delete rules |
//! | [`service`] | The `RepositoryService` port |
//! | [`pagination`] | Lazy cursor-paginated listings |
//! | [`authors`] | Roster membership evaluator |
//! | [`reconcile`] | Add/delete passes and the run entry point |

pub mod authors;
pub mod errors;
pub mod identifiers;
pub mod pagination;
pub mod reconcile;
pub mod rules;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use authors::{AuthorResolver, Authors, MembershipCache, RuleCategory, Side};
pub use errors::{ServiceError, SyncError};
pub use identifiers::{
    Login, ProjectId, ProjectItemId, ProjectNumber, PullRequestId, PullRequestNumber,
    RepositoryName, RunId, TeamSlug, UserId,
};
pub use pagination::{Cursor, Page, PageRequest, PageSource, PageStream, PAGE_SIZE};
pub use reconcile::{
    run, AddSummary, Candidates, DeleteSummary, ProjectBoard, Reconciler, RunSummary,
};
pub use rules::{AddRules, AuthorRules, DeleteRules, RosterRules, SyncConfig, SyncRules};
pub use service::RepositoryService;
pub use types::{
    Author, AuthorKind, InvalidState, Project, ProjectKey, ProjectLink, ProjectLocator,
    PullRequest, PullRequestState, RepositoryRef, TeamMember, TeamRef, Timestamp,
};
