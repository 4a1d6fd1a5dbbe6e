//! Port trait for the remote repository service.
//!
//! The membership evaluator and the reconciliation engine talk to GitHub only
//! through [`RepositoryService`]. The `github` crate supplies the production
//! implementation; tests supply an in-memory one.

use async_trait::async_trait;

use crate::{
    Login, PageStream, Project, ProjectId, ProjectItemId, ProjectLocator, PullRequest,
    PullRequestId, PullRequestState, RepositoryRef, ServiceError, TeamMember, TeamRef, UserId,
};

/// Read and mutation operations the core needs from the remote service.
///
/// Listing operations return a lazy [`PageStream`]; nothing is fetched until
/// the caller pulls the first item.
#[async_trait]
pub trait RepositoryService: Send + Sync {
    /// Fetches board metadata.
    ///
    /// Fails with [`ServiceError::NotFound`] if the board does not exist.
    async fn fetch_project(&self, project: &ProjectLocator) -> Result<Project, ServiceError>;

    /// Lists every pull request on the board, each carrying its board item id.
    fn project_pull_requests(&self, project: &ProjectLocator) -> PageStream<'_, PullRequest>;

    /// Lists a repository's pull requests in any of `states`.
    fn repository_pull_requests(
        &self,
        repository: &RepositoryRef,
        states: &[PullRequestState],
    ) -> PageStream<'_, PullRequest>;

    /// Lists every member of a team.
    ///
    /// Fails with [`ServiceError::NotFound`] if the team does not exist.
    async fn team_members(&self, team: &TeamRef) -> Result<Vec<TeamMember>, ServiceError>;

    /// Lists the organizations a user publicly belongs to.
    ///
    /// An empty result may mean the user's memberships are private.
    async fn user_organizations(&self, login: &Login) -> Result<Vec<Login>, ServiceError>;

    /// Checks membership of `login` in `org` explicitly.
    async fn is_organization_member(&self, login: &Login, org: &Login)
        -> Result<bool, ServiceError>;

    /// Resolves a login to its node id.
    ///
    /// Fails with [`ServiceError::NotFound`] if there is no such user.
    async fn lookup_user(&self, login: &Login) -> Result<UserId, ServiceError>;

    /// Links a pull request to a board.
    async fn link_pull_request(
        &self,
        project: &ProjectId,
        pull_request: &PullRequestId,
    ) -> Result<(), ServiceError>;

    /// Removes a board item from a board.
    async fn unlink_pull_request(
        &self,
        project: &ProjectId,
        item: &ProjectItemId,
    ) -> Result<(), ServiceError>;

    /// Adds `user` to the assignees of a pull request.
    async fn assign_user(
        &self,
        pull_request: &PullRequestId,
        user: &UserId,
    ) -> Result<(), ServiceError>;
}
