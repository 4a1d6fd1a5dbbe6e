//! [`GithubClient`]: the production [`RepositoryService`].

use std::time::Duration;

use async_trait::async_trait;
use board::{
    Login, PageStream, Project, ProjectId, ProjectItemId, ProjectLocator, PullRequest,
    PullRequestId, PullRequestState, RepositoryRef, RepositoryService, ServiceError, TeamMember,
    TeamRef, UserId,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::redirect::Policy;
use reqwest::{RequestBuilder, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::endpoint::ApiEndpoint;
use crate::pages::{ProjectItems, RepositoryPullRequests, TeamMembers, UserOrganizations};
use crate::queries::{
    Document, ADD_ASSIGNEES, ADD_PROJECT_ITEM, DELETE_PROJECT_ITEM, LOOKUP_USER, PROJECT, VIEWER,
};
use crate::wire::{self, Envelope, LookupUserData, ProjectData, ViewerData};

/// Deadline applied to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("prsync/", env!("CARGO_PKG_VERSION"));

/// Errors constructing a [`GithubClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The token cannot be sent as an HTTP header value.
    #[error("access token contains characters not allowed in an HTTP header")]
    InvalidToken,

    /// The HTTP client could not be built (e.g. no TLS backend).
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// GitHub GraphQL and REST client authenticated with a bearer token.
///
/// Redirects are never followed: the organization membership check answers
/// with a bare 302 when the token's owner cannot see the membership.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    endpoint: ApiEndpoint,
}

impl GithubClient {
    /// Creates a client for `endpoint`.
    pub fn new(endpoint: ApiEndpoint, token: &str) -> Result<Self, ClientError> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::InvalidToken)?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .redirect(Policy::none())
            .build()?;

        Ok(Self { http, endpoint })
    }

    /// The API base URL.
    pub fn endpoint(&self) -> &ApiEndpoint {
        &self.endpoint
    }

    /// Verifies that both the GraphQL and the REST API answer with the
    /// configured credentials. Returns the authenticated login.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn check_endpoint(&self) -> Result<Login, ServiceError> {
        let login = self
            .graphql::<ViewerData>(VIEWER, json!({}), "viewer")
            .await?
            .into_login()?;

        let response = self.send(self.http.get(self.endpoint.join(&["user"]))).await?;
        if !response.status().is_success() {
            return Err(error_response(response).await);
        }

        debug!(%login, "API endpoint reachable");
        Ok(login)
    }

    /// Runs a GraphQL document and decodes its `data`.
    ///
    /// `what` names the object the request is about; it is what a
    /// [`ServiceError::NotFound`] reports.
    pub(crate) async fn graphql<T: DeserializeOwned>(
        &self,
        document: Document,
        variables: Value,
        what: &str,
    ) -> Result<T, ServiceError> {
        debug!(operation = document.name, %what, "graphql request");

        let body = json!({ "query": document.text, "variables": variables });
        let response = self
            .send(self.http.post(self.endpoint.graphql()).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(error_response(response).await);
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            ServiceError::transport(format!("error decoding {} response: {e}", document.name))
        })?;
        envelope.into_data(what)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        request
            .send()
            .await
            .map_err(|e| ServiceError::transport(e.to_string()))
    }
}

async fn error_response(response: Response) -> ServiceError {
    let status = response.status();
    // The body only refines the message; failing to read it is not an error of its own.
    let body = response.text().await.unwrap_or_default();
    wire::http_error(status, &body)
}

#[async_trait]
impl RepositoryService for GithubClient {
    async fn fetch_project(&self, project: &ProjectLocator) -> Result<Project, ServiceError> {
        let what = format!("project {project}");
        self.graphql::<ProjectData>(
            PROJECT,
            json!({ "owner": project.owner, "number": project.number }),
            &what,
        )
        .await?
        .into_project(&what)
    }

    fn project_pull_requests(&self, project: &ProjectLocator) -> PageStream<'_, PullRequest> {
        PageStream::new(ProjectItems {
            client: self,
            project: project.clone(),
        })
    }

    fn repository_pull_requests(
        &self,
        repository: &RepositoryRef,
        states: &[PullRequestState],
    ) -> PageStream<'_, PullRequest> {
        PageStream::new(RepositoryPullRequests {
            client: self,
            repository: repository.clone(),
            states: states.to_vec(),
        })
    }

    async fn team_members(&self, team: &TeamRef) -> Result<Vec<TeamMember>, ServiceError> {
        PageStream::new(TeamMembers {
            client: self,
            team: team.clone(),
        })
        .try_collect()
        .await
    }

    async fn user_organizations(&self, login: &Login) -> Result<Vec<Login>, ServiceError> {
        PageStream::new(UserOrganizations {
            client: self,
            login: login.clone(),
        })
        .try_collect()
        .await
    }

    async fn is_organization_member(
        &self,
        login: &Login,
        org: &Login,
    ) -> Result<bool, ServiceError> {
        let url = self
            .endpoint
            .join(&["orgs", org.as_str(), "members", login.as_str()]);
        let response = self.send(self.http.get(url)).await?;
        let status = response.status();
        match wire::membership(status) {
            Some(member) => {
                debug!(%login, %org, status = status.as_u16(), member, "membership check");
                Ok(member)
            }
            None => Err(error_response(response).await),
        }
    }

    async fn lookup_user(&self, login: &Login) -> Result<UserId, ServiceError> {
        let what = format!("user {login}");
        self.graphql::<LookupUserData>(LOOKUP_USER, json!({ "login": login }), &what)
            .await?
            .into_user_id(&what)
    }

    async fn link_pull_request(
        &self,
        project: &ProjectId,
        pull_request: &PullRequestId,
    ) -> Result<(), ServiceError> {
        self.graphql::<IgnoredAny>(
            ADD_PROJECT_ITEM,
            json!({ "projectId": project, "contentId": pull_request }),
            &format!("pull request {pull_request}"),
        )
        .await
        .map(drop)
    }

    async fn unlink_pull_request(
        &self,
        project: &ProjectId,
        item: &ProjectItemId,
    ) -> Result<(), ServiceError> {
        self.graphql::<IgnoredAny>(
            DELETE_PROJECT_ITEM,
            json!({ "projectId": project, "itemId": item }),
            &format!("project item {item}"),
        )
        .await
        .map(drop)
    }

    async fn assign_user(
        &self,
        pull_request: &PullRequestId,
        user: &UserId,
    ) -> Result<(), ServiceError> {
        self.graphql::<IgnoredAny>(
            ADD_ASSIGNEES,
            json!({ "assignableId": pull_request, "assigneeIds": [user] }),
            &format!("pull request {pull_request}"),
        )
        .await
        .map(drop)
    }
}
