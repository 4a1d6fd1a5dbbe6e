//! Shared value types for the board synchronization domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types are
//! snapshots of remote state (pull requests, boards, teams) fetched once per
//! run. They are never written back; changes to remote state happen only
//! through the mutation methods of [`crate::RepositoryService`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Login, ProjectId, ProjectItemId, ProjectNumber, PullRequestId, PullRequestNumber,
    RepositoryName, TeamSlug,
};

// ---------------------------------------------------------------------------
// Pull request lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    /// Open for review.
    Open,
    /// Closed without merging.
    Closed,
    /// Merged into its base branch.
    Merged,
}

impl PullRequestState {
    /// The GraphQL enum value for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Merged => "MERGED",
        }
    }
}

impl std::fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`PullRequestState`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pull request state: {0}")]
pub struct InvalidState(pub String);

impl std::str::FromStr for PullRequestState {
    type Err = InvalidState;

    /// Parses a state name case-insensitively (`"merged"`, `"MERGED"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "MERGED" => Ok(Self::Merged),
            _ => Err(InvalidState(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Authors
// ---------------------------------------------------------------------------

/// What kind of account opened a pull request.
///
/// Only [`AuthorKind::User`] authors ever qualify for the board; bots are
/// skipped even when their login matches a roster rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorKind {
    /// A human account.
    User,
    /// A GitHub App or bot account.
    Bot,
    /// Anything else: mannequins, organizations, deleted accounts.
    Other,
}

/// The author of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Account login.
    pub login: Login,
    /// Account kind.
    pub kind: AuthorKind,
}

impl Author {
    /// Returns `true` if the author is a human account.
    pub fn is_user(&self) -> bool {
        self.kind == AuthorKind::User
    }
}

// ---------------------------------------------------------------------------
// Repositories, teams, boards
// ---------------------------------------------------------------------------

/// A repository in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Owning user or organization.
    pub owner: Login,
    /// Repository name.
    pub name: RepositoryName,
}

impl RepositoryRef {
    /// Creates a repository reference.
    pub fn new(owner: Login, name: RepositoryName) -> Self {
        Self { owner, name }
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A team within an organization, in `org/slug` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamRef {
    /// Organization that owns the team.
    pub org: Login,
    /// Team slug.
    pub slug: TeamSlug,
}

impl TeamRef {
    /// Creates a team reference.
    pub fn new(org: Login, slug: TeamSlug) -> Self {
        Self { org, slug }
    }
}

impl std::fmt::Display for TeamRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.org, self.slug)
    }
}

/// One member of a team, with the node id needed for assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    /// Member login.
    pub login: Login,
    /// Member node id.
    pub id: crate::UserId,
}

/// Locates a Projects (v2) board owned by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectLocator {
    /// Owning organization.
    pub owner: Login,
    /// Board number within the organization.
    pub number: ProjectNumber,
}

impl std::fmt::Display for ProjectLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.number)
    }
}

/// A board a pull request is already linked to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectLink {
    /// Owning organization or user of the board.
    pub owner: Login,
    /// Board number.
    pub number: ProjectNumber,
}

impl ProjectLink {
    /// Returns `true` if this link points at the board `locator` identifies.
    pub fn is(&self, locator: &ProjectLocator) -> bool {
        self.owner == locator.owner && self.number == locator.number
    }
}

/// Board metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Board node id, target of link/unlink mutations.
    pub id: ProjectId,
    /// Board number.
    pub number: ProjectNumber,
    /// Human-readable title.
    pub title: String,
}

// ---------------------------------------------------------------------------
// Pull requests
// ---------------------------------------------------------------------------

/// Natural key matching a repository-sourced pull request against a
/// board-sourced one.
///
/// Ordering is (owner, repository, number) so board listings group by
/// repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectKey {
    /// Repository owner.
    pub owner: Login,
    /// Repository name.
    pub repository: RepositoryName,
    /// Pull request number.
    pub number: PullRequestNumber,
}

impl std::fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repository, self.number)
    }
}

/// Snapshot of a pull request, fetched either from a repository listing or
/// from a board listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Node id, target of link and assign mutations.
    pub id: PullRequestId,
    /// Per-repository number.
    pub number: PullRequestNumber,
    /// Title.
    pub title: String,
    /// Web URL, used for logging.
    pub url: String,
    /// Author of the pull request.
    pub author: Author,
    /// `true` for draft pull requests.
    pub is_draft: bool,
    /// Lifecycle state.
    pub state: PullRequestState,
    /// Owning repository.
    pub repository: RepositoryRef,
    /// Board item linking this pull request to the board it was listed from.
    ///
    /// `Some` only for pull requests listed from a board.
    pub project_item: Option<ProjectItemId>,
    /// Logins currently assigned.
    pub assignees: BTreeSet<Login>,
    /// Boards this pull request is already linked to.
    pub projects: Vec<ProjectLink>,
}

impl PullRequest {
    /// The key used to match this pull request against board entries.
    pub fn key(&self) -> ProjectKey {
        ProjectKey {
            owner: self.repository.owner.clone(),
            repository: self.repository.name.clone(),
            number: self.number,
        }
    }

    /// Returns `true` if the author is among the assignees.
    pub fn is_author_assigned(&self) -> bool {
        self.assignees.contains(&self.author.login)
    }

    /// Returns `true` if already linked to the board `locator` identifies.
    pub fn is_linked_to(&self, locator: &ProjectLocator) -> bool {
        self.projects.iter().any(|link| link.is(locator))
    }

    /// `"DRAFT"` or `"PR"`, for log lines.
    pub fn draft_label(&self) -> &'static str {
        if self.is_draft {
            "DRAFT"
        } else {
            "PR"
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Seconds elapsed between `self` and a later timestamp.
    pub fn seconds_until(self, later: Timestamp) -> f64 {
        (later.0 - self.0).num_milliseconds() as f64 / 1000.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
