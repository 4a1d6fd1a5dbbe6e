//! Roster membership resolution.
//!
//! [`Authors`] decides whether a login belongs to the configured roster and
//! resolves logins to node ids. Remote lookups are memoized in a
//! [`MembershipCache`] owned by the evaluator, so one run never asks the same
//! question twice. Nothing is cached from a failed remote call; a later call
//! re-attempts it.
//!
//! ## Precedence
//!
//! The first matching rule wins:
//!
//! 1. No rules at all: everyone is included.
//! 2. Excluded by user name.
//! 3. Included by user name.
//! 4. Excluded by team.
//! 5. Included by team.
//! 6. Excluded by organization.
//! 7. Included by organization.
//! 8. Otherwise included only if there are no include rules, i.e. an
//!    exclude-only roster means "everyone except the excluded".

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::{AuthorRules, Login, RepositoryService, RosterRules, ServiceError, TeamRef, UserId};

/// Roster membership queries used by the reconciliation engine.
#[async_trait]
pub trait AuthorResolver: Send {
    /// Returns `true` if `login` belongs to the roster.
    async fn resolve(&mut self, login: &Login) -> Result<bool, ServiceError>;

    /// Resolves `login` to its node id.
    async fn user_id(&mut self, login: &Login) -> Result<UserId, ServiceError>;
}

/// Which side of the roster a rule sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// `include` rules.
    Include,
    /// `exclude` rules.
    Exclude,
}

/// A rule category whose per-login decision is memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    /// Team membership rules on one side.
    Team(Side),
    /// Organization membership rules on one side.
    Org(Side),
}

/// What is known about one login's organizations.
#[derive(Debug, Clone, Default)]
struct OrgMembership {
    /// Organizations the user lists publicly.
    visible: HashSet<Login>,
    /// Results of explicit membership checks, made only when `visible` is
    /// empty (the profile may be private).
    probed: HashMap<Login, bool>,
}

impl OrgMembership {
    fn is_member(&self, org: &Login) -> bool {
        self.visible.contains(org) || self.probed.get(org).copied().unwrap_or(false)
    }
}

/// Memoized remote answers, scoped to one run.
///
/// Grows monotonically; entries are committed only after a successful remote
/// response.
#[derive(Debug, Default)]
pub struct MembershipCache {
    ids: HashMap<Login, UserId>,
    team_members: HashMap<TeamRef, HashSet<Login>>,
    org_members: HashMap<Login, OrgMembership>,
    decisions: HashMap<(RuleCategory, Login), bool>,
}

impl MembershipCache {
    /// Returns the settled decision for `login` in `category`, if any.
    pub fn decision(&self, category: RuleCategory, login: &Login) -> Option<bool> {
        self.decisions.get(&(category, login.clone())).copied()
    }

    /// Returns the cached node id of `login`, if any.
    pub fn user_id(&self, login: &Login) -> Option<&UserId> {
        self.ids.get(login)
    }
}

/// The membership rule evaluator.
pub struct Authors {
    service: Arc<dyn RepositoryService>,
    rules: RosterRules,
    cache: MembershipCache,
}

impl Authors {
    /// Builds the evaluator, fetching the members of every team referenced by
    /// the roster.
    ///
    /// Fails if any team cannot be fetched; an evaluator never exists with
    /// partially resolved teams.
    #[instrument(skip_all)]
    pub async fn new(
        service: Arc<dyn RepositoryService>,
        rules: RosterRules,
    ) -> Result<Self, ServiceError> {
        let mut cache = MembershipCache::default();

        for team in rules.teams() {
            debug!(%team, "fetching team members");
            let members = service.team_members(team).await?;

            let logins = cache.team_members.entry(team.clone()).or_default();
            for member in members {
                debug!(%team, login = %member.login, "team member");
                cache.ids.insert(member.login.clone(), member.id);
                logins.insert(member.login);
            }
        }

        Ok(Self {
            service,
            rules,
            cache,
        })
    }

    /// The evaluator's cache.
    pub fn cache(&self) -> &MembershipCache {
        &self.cache
    }

    fn side(&self, side: Side) -> &AuthorRules {
        match side {
            Side::Include => &self.rules.include,
            Side::Exclude => &self.rules.exclude,
        }
    }

    /// Team rule check against the team members fetched at construction.
    fn team_rule(&mut self, side: Side, login: &Login) -> bool {
        let teams = match side {
            Side::Include => &self.rules.include.teams,
            Side::Exclude => &self.rules.exclude.teams,
        };
        if teams.is_empty() {
            return false;
        }

        let category = RuleCategory::Team(side);
        if let Some(decision) = self.cache.decision(category, login) {
            return decision;
        }

        let matched = teams.iter().any(|team| {
            self.cache
                .team_members
                .get(team)
                .is_some_and(|members| members.contains(login))
        });
        self.cache.decisions.insert((category, login.clone()), matched);
        matched
    }

    /// Organization rule check; fetches the login's organizations at most once.
    async fn org_rule(&mut self, side: Side, login: &Login) -> Result<bool, ServiceError> {
        let orgs = match side {
            Side::Include => &self.rules.include.orgs,
            Side::Exclude => &self.rules.exclude.orgs,
        };
        if orgs.is_empty() {
            return Ok(false);
        }

        let category = RuleCategory::Org(side);
        if let Some(decision) = self.cache.decision(category, login) {
            return Ok(decision);
        }

        let service = &self.service;
        let membership = match self.cache.org_members.entry(login.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(%login, "fetching organizations");
                let visible = service.user_organizations(login).await?;
                entry.insert(OrgMembership {
                    visible: visible.into_iter().collect(),
                    probed: HashMap::new(),
                })
            }
        };

        if membership.visible.is_empty() {
            for org in orgs {
                if membership.probed.contains_key(org) {
                    continue;
                }
                debug!(%login, %org, "checking organization membership");
                let is_member = service.is_organization_member(login, org).await?;
                membership.probed.insert(org.clone(), is_member);
            }
        }

        let matched = orgs.iter().any(|org| membership.is_member(org));
        self.cache.decisions.insert((category, login.clone()), matched);
        Ok(matched)
    }
}

#[async_trait]
impl AuthorResolver for Authors {
    async fn resolve(&mut self, login: &Login) -> Result<bool, ServiceError> {
        if self.rules.is_empty() {
            return Ok(true);
        }

        if self.side(Side::Exclude).users.contains(login) {
            return Ok(false);
        }
        if self.side(Side::Include).users.contains(login) {
            return Ok(true);
        }

        if self.team_rule(Side::Exclude, login) {
            return Ok(false);
        }
        if self.team_rule(Side::Include, login) {
            return Ok(true);
        }

        if self.org_rule(Side::Exclude, login).await? {
            return Ok(false);
        }
        if self.org_rule(Side::Include, login).await? {
            return Ok(true);
        }

        Ok(self.side(Side::Include).is_empty())
    }

    async fn user_id(&mut self, login: &Login) -> Result<UserId, ServiceError> {
        if let Some(id) = self.cache.ids.get(login) {
            return Ok(id.clone());
        }

        debug!(%login, "fetching user id");
        let id = self.service.lookup_user(login).await?;
        self.cache.ids.insert(login.clone(), id.clone());
        Ok(id)
    }
}

#[cfg(test)]
mod tests;
