//! YAML configuration file.
//!
//! The file is decoded into [`ConfigFile`], a plain mirror of the YAML, and
//! then validated into [`Settings`]. Every validation failure is reported
//! before any remote call is made.

use std::path::{Path, PathBuf};

use board::{
    AddRules, AuthorRules, DeleteRules, InvalidState, Login, ProjectLocator, ProjectNumber,
    PullRequestState, RepositoryName, RepositoryRef, RosterRules, SyncConfig, SyncRules, TeamRef,
    TeamSlug,
};
use github::{ApiEndpoint, InvalidEndpoint, DEFAULT_API_URL};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Endpoint(#[from] InvalidEndpoint),

    #[error("invalid project: {0}")]
    Project(String),

    #[error("invalid repository: {0}")]
    Repository(String),

    #[error("no repositories specified")]
    NoRepositories,

    #[error("invalid team: {0}")]
    Team(String),

    #[error("invalid {kind}: {value:?}")]
    Login { kind: &'static str, value: String },

    #[error("can't include and exclude the same {kind}: {value}")]
    IncludedAndExcluded { kind: &'static str, value: String },

    #[error("invalid pullRequests.{section} state: {source}")]
    State {
        section: &'static str,
        #[source]
        source: InvalidState,
    },

    #[error("can't add and delete pull requests in {0} state")]
    AddedAndDeleted(PullRequestState),
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// The configuration file as written.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub github: GithubSection,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub repos: Vec<String>,
    #[serde(default)]
    pub authors: AuthorsSection,
    #[serde(default)]
    pub pull_requests: PullRequestsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GithubSection {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorsSection {
    #[serde(default)]
    pub include: AuthorRulesSection,
    #[serde(default)]
    pub exclude: AuthorRulesSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorRulesSection {
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub orgs: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PullRequestsSection {
    #[serde(default)]
    pub add: AddSection,
    #[serde(default)]
    pub delete: DeleteSection,
    // Pre-`add`/`delete` keys. Accepted so older files still load, but
    // their values are ignored.
    assign_author: Option<serde_yaml::Value>,
    include_drafts: Option<serde_yaml::Value>,
    delete_merged: Option<serde_yaml::Value>,
    delete_closed: Option<serde_yaml::Value>,
    delete_for_all_authors: Option<serde_yaml::Value>,
    states: Option<serde_yaml::Value>,
}

impl PullRequestsSection {
    /// Names of the legacy keys present in the file.
    pub fn legacy_keys(&self) -> Vec<&'static str> {
        [
            ("assignAuthor", self.assign_author.is_some()),
            ("includeDrafts", self.include_drafts.is_some()),
            ("deleteMerged", self.delete_merged.is_some()),
            ("deleteClosed", self.delete_closed.is_some()),
            ("deleteForAllAuthors", self.delete_for_all_authors.is_some()),
            ("states", self.states.is_some()),
        ]
        .into_iter()
        .filter_map(|(key, present)| present.then_some(key))
        .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddSection {
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub assign_author: bool,
    #[serde(default)]
    pub drafts: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteSection {
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub drafts: bool,
    #[serde(default)]
    pub all_authors: bool,
}

// ---------------------------------------------------------------------------
// Validated settings
// ---------------------------------------------------------------------------

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// GitHub API base URL.
    pub endpoint: ApiEndpoint,
    /// What to synchronize. `dry_run` is always `false` here; it comes from
    /// the command line.
    pub sync: SyncConfig,
}

/// Reads and validates the configuration file at `path`.
pub fn load(path: &Path) -> Result<Settings, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents).map_err(|err| match err {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Parses and validates configuration text.
pub fn parse(contents: &str) -> Result<Settings, ConfigError> {
    let file: ConfigFile = serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: PathBuf::new(),
        source,
    })?;
    file.validate()
}

impl ConfigFile {
    /// Checks every value and builds [`Settings`].
    pub fn validate(self) -> Result<Settings, ConfigError> {
        let endpoint: ApiEndpoint = self
            .github
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .parse()?;

        let project = parse_project(&self.project)?;

        let repositories = self
            .repos
            .iter()
            .map(|repo| parse_repository(repo))
            .collect::<Result<Vec<_>, _>>()?;
        if repositories.is_empty() {
            return Err(ConfigError::NoRepositories);
        }

        let roster = parse_roster(self.authors)?;
        let rules = parse_rules(self.pull_requests)?;

        Ok(Settings {
            endpoint,
            sync: SyncConfig {
                project,
                repositories,
                roster,
                rules,
                dry_run: false,
            },
        })
    }
}

fn split_pair(value: &str) -> Option<(&str, &str)> {
    let (left, right) = value.split_once('/')?;
    if left.is_empty() || right.is_empty() || right.contains('/') {
        return None;
    }
    Some((left, right))
}

fn parse_project(value: &str) -> Result<ProjectLocator, ConfigError> {
    let invalid = || ConfigError::Project(value.to_string());
    let (owner, number) = split_pair(value).ok_or_else(invalid)?;
    Ok(ProjectLocator {
        owner: Login::new(owner).ok_or_else(invalid)?,
        number: ProjectNumber::new(number.parse().map_err(|_| invalid())?),
    })
}

fn parse_repository(value: &str) -> Result<RepositoryRef, ConfigError> {
    let invalid = || ConfigError::Repository(value.to_string());
    let (owner, name) = split_pair(value).ok_or_else(invalid)?;
    Ok(RepositoryRef::new(
        Login::new(owner).ok_or_else(invalid)?,
        RepositoryName::new(name).ok_or_else(invalid)?,
    ))
}

fn parse_team(value: &str) -> Result<TeamRef, ConfigError> {
    let invalid = || ConfigError::Team(value.to_string());
    let (org, slug) = split_pair(value).ok_or_else(invalid)?;
    Ok(TeamRef::new(
        Login::new(org).ok_or_else(invalid)?,
        TeamSlug::new(slug).ok_or_else(invalid)?,
    ))
}

fn parse_logins(kind: &'static str, values: &[String]) -> Result<Vec<Login>, ConfigError> {
    values
        .iter()
        .map(|value| {
            Login::new(value.as_str()).ok_or_else(|| ConfigError::Login {
                kind,
                value: value.clone(),
            })
        })
        .collect()
}

fn parse_author_rules(section: &AuthorRulesSection) -> Result<AuthorRules, ConfigError> {
    Ok(AuthorRules {
        users: parse_logins("user", &section.users)?,
        teams: section
            .teams
            .iter()
            .map(|team| parse_team(team))
            .collect::<Result<_, _>>()?,
        orgs: parse_logins("organization", &section.orgs)?,
    })
}

fn reject_overlap<T: PartialEq + std::fmt::Display>(
    kind: &'static str,
    include: &[T],
    exclude: &[T],
) -> Result<(), ConfigError> {
    match exclude.iter().find(|excluded| include.contains(excluded)) {
        Some(value) => Err(ConfigError::IncludedAndExcluded {
            kind,
            value: value.to_string(),
        }),
        None => Ok(()),
    }
}

fn parse_roster(section: AuthorsSection) -> Result<RosterRules, ConfigError> {
    let include = parse_author_rules(&section.include)?;
    let exclude = parse_author_rules(&section.exclude)?;

    reject_overlap("team", &include.teams, &exclude.teams)?;
    reject_overlap("user", &include.users, &exclude.users)?;
    reject_overlap("organization", &include.orgs, &exclude.orgs)?;

    Ok(RosterRules { include, exclude })
}

fn parse_states(
    section: &'static str,
    values: &[String],
) -> Result<Vec<PullRequestState>, ConfigError> {
    values
        .iter()
        .map(|value| {
            value
                .parse()
                .map_err(|source| ConfigError::State { section, source })
        })
        .collect()
}

fn parse_rules(section: PullRequestsSection) -> Result<SyncRules, ConfigError> {
    for key in section.legacy_keys() {
        warn!(
            %key,
            "ignoring obsolete pullRequests setting; use pullRequests.add or pullRequests.delete"
        );
    }

    let mut add_states = parse_states("add", &section.add.states)?;
    if add_states.is_empty() {
        add_states = AddRules::default().states;
    }
    let delete_states = parse_states("delete", &section.delete.states)?;

    if let Some(state) = delete_states.iter().find(|s| add_states.contains(s)) {
        return Err(ConfigError::AddedAndDeleted(*state));
    }

    Ok(SyncRules {
        add: AddRules {
            states: add_states,
            assign_author: section.add.assign_author,
            drafts: section.add.drafts,
        },
        delete: DeleteRules {
            states: delete_states,
            drafts: section.delete.drafts,
            all_authors: section.delete.all_authors,
        },
    })
}
