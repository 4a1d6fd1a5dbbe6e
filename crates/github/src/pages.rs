//! [`PageSource`] implementations, one per paginated GraphQL listing.

use async_trait::async_trait;
use board::{
    Cursor, Login, Page, PageRequest, PageSource, ProjectLocator, PullRequest, PullRequestState,
    RepositoryRef, ServiceError, TeamMember, TeamRef,
};
use serde_json::json;

use crate::queries::{PROJECT_ITEMS, REPOSITORY_PULL_REQUESTS, TEAM_MEMBERS, USER_ORGANIZATIONS};
use crate::wire::{ProjectItemsData, RepositoryPullRequestsData, TeamMembersData, UserOrganizationsData};
use crate::GithubClient;

fn after(request: &PageRequest) -> Option<&str> {
    request.after.as_ref().map(Cursor::as_str)
}

/// Pull requests on a board.
pub(crate) struct ProjectItems<'a> {
    pub client: &'a GithubClient,
    pub project: ProjectLocator,
}

#[async_trait]
impl<'a> PageSource<PullRequest> for ProjectItems<'a> {
    async fn fetch(&mut self, request: PageRequest) -> Result<Page<PullRequest>, ServiceError> {
        let what = format!("project {}", self.project);
        let variables = json!({
            "owner": self.project.owner,
            "number": self.project.number,
            "first": request.first,
            "after": after(&request),
        });
        self.client
            .graphql::<ProjectItemsData>(PROJECT_ITEMS, variables, &what)
            .await?
            .into_page(&what)
    }
}

/// Pull requests of a repository in the given states.
pub(crate) struct RepositoryPullRequests<'a> {
    pub client: &'a GithubClient,
    pub repository: RepositoryRef,
    pub states: Vec<PullRequestState>,
}

#[async_trait]
impl<'a> PageSource<PullRequest> for RepositoryPullRequests<'a> {
    async fn fetch(&mut self, request: PageRequest) -> Result<Page<PullRequest>, ServiceError> {
        let what = format!("repository {}", self.repository);
        let variables = json!({
            "owner": self.repository.owner,
            "name": self.repository.name,
            "states": self.states,
            "first": request.first,
            "after": after(&request),
        });
        self.client
            .graphql::<RepositoryPullRequestsData>(REPOSITORY_PULL_REQUESTS, variables, &what)
            .await?
            .into_page(&what)
    }
}

/// Members of a team.
pub(crate) struct TeamMembers<'a> {
    pub client: &'a GithubClient,
    pub team: TeamRef,
}

#[async_trait]
impl<'a> PageSource<TeamMember> for TeamMembers<'a> {
    async fn fetch(&mut self, request: PageRequest) -> Result<Page<TeamMember>, ServiceError> {
        let what = format!("team {}", self.team);
        let variables = json!({
            "org": self.team.org,
            "slug": self.team.slug,
            "first": request.first,
            "after": after(&request),
        });
        self.client
            .graphql::<TeamMembersData>(TEAM_MEMBERS, variables, &what)
            .await?
            .into_page(&what)
    }
}

/// Organizations a user publicly belongs to.
pub(crate) struct UserOrganizations<'a> {
    pub client: &'a GithubClient,
    pub login: Login,
}

#[async_trait]
impl<'a> PageSource<Login> for UserOrganizations<'a> {
    async fn fetch(&mut self, request: PageRequest) -> Result<Page<Login>, ServiceError> {
        let what = format!("user {}", self.login);
        let variables = json!({
            "login": self.login,
            "first": request.first,
            "after": after(&request),
        });
        self.client
            .graphql::<UserOrganizationsData>(USER_ORGANIZATIONS, variables, &what)
            .await?
            .into_page(&what)
    }
}
