//! In-memory [`RepositoryService`] for unit tests.
//!
//! Every call is recorded so tests can assert on exactly which remote
//! operations a scenario triggers.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::pagination::{Cursor, Page};
use crate::{
    Author, AuthorKind, Login, PageStream, Project, ProjectId, ProjectItemId, ProjectLocator,
    ProjectNumber, PullRequest, PullRequestId, PullRequestNumber, PullRequestState,
    RepositoryName, RepositoryRef, RepositoryService, ServiceError, TeamMember, TeamRef,
    TeamSlug, UserId,
};

/// Items per fake page; small so listings span several pages.
const FAKE_PAGE_SIZE: usize = 2;

pub(crate) fn login(value: &str) -> Login {
    Login::new(value).expect("non-empty login")
}

pub(crate) fn team(org: &str, slug: &str) -> TeamRef {
    TeamRef::new(login(org), TeamSlug::new(slug).expect("non-empty slug"))
}

pub(crate) fn repo(owner: &str, name: &str) -> RepositoryRef {
    RepositoryRef::new(login(owner), RepositoryName::new(name).expect("non-empty name"))
}

pub(crate) fn user_id(login: &str) -> UserId {
    UserId::new(format!("U_{login}")).expect("non-empty id")
}

pub(crate) fn project_locator() -> ProjectLocator {
    ProjectLocator {
        owner: login("acme"),
        number: ProjectNumber::new(7),
    }
}

pub(crate) fn project() -> Project {
    Project {
        id: ProjectId::new("PVT_acme_7").expect("non-empty id"),
        number: ProjectNumber::new(7),
        title: "Reviews".to_string(),
    }
}

/// An open, non-draft pull request by a human author.
pub(crate) fn pull_request(repository: &RepositoryRef, number: u64, author: &str) -> PullRequest {
    PullRequest {
        id: PullRequestId::new(format!("PR_{}_{}_{number}", repository.owner, repository.name))
            .expect("non-empty id"),
        number: PullRequestNumber::new(number),
        title: format!("Change {number}"),
        url: format!("https://github.com/{repository}/pull/{number}"),
        author: Author {
            login: login(author),
            kind: AuthorKind::User,
        },
        is_draft: false,
        state: PullRequestState::Open,
        repository: repository.clone(),
        project_item: None,
        assignees: BTreeSet::new(),
        projects: Vec::new(),
    }
}

/// The same pull request as listed from the board.
pub(crate) fn on_board(mut pull_request: PullRequest) -> PullRequest {
    pull_request.project_item = Some(
        ProjectItemId::new(format!("PVTI_{}", pull_request.id)).expect("non-empty id"),
    );
    pull_request.projects.push(crate::ProjectLink {
        owner: login("acme"),
        number: ProjectNumber::new(7),
    });
    pull_request
}

/// A recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    FetchProject,
    ProjectPullRequests,
    RepositoryPullRequests(RepositoryRef),
    TeamMembers(TeamRef),
    UserOrganizations(Login),
    IsOrganizationMember(Login, Login),
    LookupUser(Login),
    Link(ProjectId, PullRequestId),
    Unlink(ProjectId, ProjectItemId),
    Assign(PullRequestId, UserId),
}

impl Call {
    pub(crate) fn is_mutation(&self) -> bool {
        matches!(self, Call::Link(..) | Call::Unlink(..) | Call::Assign(..))
    }
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Operation {
    UserOrganizations,
    IsOrganizationMember,
    LookupUser,
    RepositoryPullRequests,
    Link,
}

#[derive(Default)]
pub(crate) struct FakeService {
    project: Option<Project>,
    board: Vec<PullRequest>,
    repositories: HashMap<RepositoryRef, Vec<PullRequest>>,
    teams: HashMap<TeamRef, Vec<TeamMember>>,
    user_orgs: HashMap<Login, Vec<Login>>,
    org_members: HashSet<(Login, Login)>,
    users: HashSet<Login>,
    failing: Mutex<HashSet<Operation>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeService {
    pub(crate) fn new() -> Self {
        Self {
            project: Some(project()),
            ..Self::default()
        }
    }

    pub(crate) fn without_project(mut self) -> Self {
        self.project = None;
        self
    }

    pub(crate) fn with_team(mut self, team: TeamRef, members: &[&str]) -> Self {
        let members = members
            .iter()
            .map(|m| TeamMember {
                login: login(m),
                id: user_id(m),
            })
            .collect();
        self.teams.insert(team, members);
        self
    }

    /// Orgs `user` lists publicly.
    pub(crate) fn with_user_orgs(mut self, user: &str, orgs: &[&str]) -> Self {
        self.user_orgs
            .insert(login(user), orgs.iter().map(|o| login(o)).collect());
        self
    }

    /// A membership only visible through an explicit check.
    pub(crate) fn with_org_member(mut self, org: &str, user: &str) -> Self {
        self.org_members.insert((login(org), login(user)));
        self
    }

    pub(crate) fn with_user(mut self, user: &str) -> Self {
        self.users.insert(login(user));
        self
    }

    pub(crate) fn with_board_item(mut self, pull_request: PullRequest) -> Self {
        self.board.push(on_board(pull_request));
        self
    }

    pub(crate) fn with_repository_pull(mut self, pull_request: PullRequest) -> Self {
        self.repositories
            .entry(pull_request.repository.clone())
            .or_default()
            .push(pull_request);
        self
    }

    pub(crate) fn fail(&self, operation: Operation) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub(crate) fn recover(&self, operation: Operation) {
        self.failing.lock().unwrap().remove(&operation);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub(crate) fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, operation: Operation) -> Result<(), ServiceError> {
        if self.failing.lock().unwrap().contains(&operation) {
            return Err(ServiceError::remote(format!("{operation:?} failed")));
        }
        Ok(())
    }

    fn paged(items: Vec<PullRequest>) -> PageStream<'static, PullRequest> {
        let chunks: Vec<Vec<PullRequest>> = items
            .chunks(FAKE_PAGE_SIZE)
            .map(|chunk| chunk.to_vec())
            .collect();
        let count = chunks.len();
        let pages = chunks
            .into_iter()
            .enumerate()
            .map(|(index, items)| {
                let next = (index + 1 < count).then(|| Cursor::new(index.to_string()));
                Ok(Page { items, next })
            })
            .collect();
        PageStream::from_pages(pages)
    }
}

#[async_trait]
impl RepositoryService for FakeService {
    async fn fetch_project(&self, _project: &ProjectLocator) -> Result<Project, ServiceError> {
        self.record(Call::FetchProject);
        self.project
            .clone()
            .ok_or_else(|| ServiceError::not_found("project acme/7"))
    }

    fn project_pull_requests(&self, _project: &ProjectLocator) -> PageStream<'_, PullRequest> {
        self.record(Call::ProjectPullRequests);
        Self::paged(self.board.clone())
    }

    fn repository_pull_requests(
        &self,
        repository: &RepositoryRef,
        states: &[PullRequestState],
    ) -> PageStream<'_, PullRequest> {
        self.record(Call::RepositoryPullRequests(repository.clone()));
        if let Err(err) = self.check(Operation::RepositoryPullRequests) {
            return PageStream::from_pages(vec![Err(err)]);
        }
        let items = self
            .repositories
            .get(repository)
            .map(|pulls| {
                pulls
                    .iter()
                    .filter(|pr| states.contains(&pr.state))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Self::paged(items)
    }

    async fn team_members(&self, team: &TeamRef) -> Result<Vec<TeamMember>, ServiceError> {
        self.record(Call::TeamMembers(team.clone()));
        self.teams
            .get(team)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(format!("team {team}")))
    }

    async fn user_organizations(&self, login: &Login) -> Result<Vec<Login>, ServiceError> {
        self.record(Call::UserOrganizations(login.clone()));
        self.check(Operation::UserOrganizations)?;
        Ok(self.user_orgs.get(login).cloned().unwrap_or_default())
    }

    async fn is_organization_member(
        &self,
        login: &Login,
        org: &Login,
    ) -> Result<bool, ServiceError> {
        self.record(Call::IsOrganizationMember(login.clone(), org.clone()));
        self.check(Operation::IsOrganizationMember)?;
        Ok(self.org_members.contains(&(org.clone(), login.clone())))
    }

    async fn lookup_user(&self, login: &Login) -> Result<UserId, ServiceError> {
        self.record(Call::LookupUser(login.clone()));
        self.check(Operation::LookupUser)?;
        if self.users.contains(login) {
            Ok(user_id(login.as_str()))
        } else {
            Err(ServiceError::not_found(format!("user {login}")))
        }
    }

    async fn link_pull_request(
        &self,
        project: &ProjectId,
        pull_request: &PullRequestId,
    ) -> Result<(), ServiceError> {
        self.record(Call::Link(project.clone(), pull_request.clone()));
        self.check(Operation::Link)
    }

    async fn unlink_pull_request(
        &self,
        project: &ProjectId,
        item: &ProjectItemId,
    ) -> Result<(), ServiceError> {
        self.record(Call::Unlink(project.clone(), item.clone()));
        Ok(())
    }

    async fn assign_user(
        &self,
        pull_request: &PullRequestId,
        user: &UserId,
    ) -> Result<(), ServiceError> {
        self.record(Call::Assign(pull_request.clone(), user.clone()));
        Ok(())
    }
}
