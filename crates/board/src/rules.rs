//! Roster and reconciliation rules.
//!
//! These are validated snapshots built once at startup by the configuration
//! loader. In particular, the loader guarantees that no user, team, or
//! organization appears on both the include and the exclude side.

use serde::{Deserialize, Serialize};

use crate::{Login, ProjectLocator, PullRequestState, RepositoryRef, TeamRef};

/// One side (include or exclude) of the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRules {
    /// Explicit user logins.
    pub users: Vec<Login>,
    /// Teams whose members match.
    pub teams: Vec<TeamRef>,
    /// Organizations whose members match.
    pub orgs: Vec<Login>,
}

impl AuthorRules {
    /// Returns `true` if this side holds no rule at all.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.teams.is_empty() && self.orgs.is_empty()
    }
}

/// The configured population of contributors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRules {
    /// Who is tracked.
    pub include: AuthorRules,
    /// Who is never tracked. Takes precedence over `include` at each level.
    pub exclude: AuthorRules,
}

impl RosterRules {
    /// Returns `true` if neither side holds any rule; everyone is included.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Every team referenced on either side, deduplicated, include side first.
    pub fn teams(&self) -> Vec<&TeamRef> {
        let mut teams: Vec<&TeamRef> = Vec::new();
        for team in self.include.teams.iter().chain(&self.exclude.teams) {
            if !teams.contains(&team) {
                teams.push(team);
            }
        }
        teams
    }
}

/// Which repository pull requests get added to the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRules {
    /// States requested from the repository listing.
    pub states: Vec<PullRequestState>,
    /// Assign the author to newly tracked pull requests they are not assigned to.
    pub assign_author: bool,
    /// Track draft pull requests too.
    pub drafts: bool,
}

impl Default for AddRules {
    fn default() -> Self {
        Self {
            states: vec![PullRequestState::Open],
            assign_author: false,
            drafts: false,
        }
    }
}

/// Which board entries get removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRules {
    /// Remove entries in any of these states.
    pub states: Vec<PullRequestState>,
    /// Remove draft entries.
    pub drafts: bool,
    /// Remove matching entries whatever their author; otherwise only entries
    /// authored by roster members.
    pub all_authors: bool,
}

impl DeleteRules {
    /// Returns `true` if no entry can ever match, so the pass can be skipped.
    pub fn is_noop(&self) -> bool {
        self.states.is_empty() && !self.drafts
    }
}

/// Add and delete rules together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRules {
    /// Add pass rules.
    pub add: AddRules,
    /// Delete pass rules.
    pub delete: DeleteRules,
}

/// Everything a run needs besides the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// The board being synchronized.
    pub project: ProjectLocator,
    /// Source repositories, in the order they are scanned.
    pub repositories: Vec<RepositoryRef>,
    /// Roster definition.
    pub roster: RosterRules,
    /// Add/delete rules.
    pub rules: SyncRules,
    /// Compute and log mutations without issuing them.
    pub dry_run: bool,
}
