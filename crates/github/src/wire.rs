//! JSON response shapes and their conversion into `board` types.
//!
//! Response structs mirror the selections in [`crate::queries`] and nothing
//! more. Conversion is where GitHub's conventions are translated: GraphQL
//! error arrays and null top-level objects become [`ServiceError`]s, a
//! deleted author becomes `ghost`, and board items that are not pull requests
//! are dropped.

use std::collections::BTreeSet;

use board::{
    Author, AuthorKind, Cursor, Login, Page, Project, ProjectId, ProjectItemId, ProjectLink,
    ProjectNumber, PullRequest, PullRequestId, PullRequestNumber, PullRequestState,
    RepositoryName, RepositoryRef, ServiceError, TeamMember, UserId,
};
use reqwest::StatusCode;
use serde::Deserialize;

/// Login GitHub shows for pull requests whose author account was deleted.
pub(crate) const GHOST_LOGIN: &str = "ghost";

// ---------------------------------------------------------------------------
// Envelope and errors
// ---------------------------------------------------------------------------

/// A GraphQL response: `data`, `errors`, or both.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlError {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub message: String,
}

impl std::fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{kind}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl<T> Envelope<T> {
    /// Returns `data`, or the error the `errors` array describes.
    ///
    /// `what` names the object the request was about, for `NotFound`.
    pub(crate) fn into_data(self, what: &str) -> Result<T, ServiceError> {
        if !self.errors.is_empty() {
            if self
                .errors
                .iter()
                .any(|e| e.kind.as_deref() == Some("NOT_FOUND"))
            {
                return Err(ServiceError::not_found(what));
            }
            let message = self
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            return Err(ServiceError::remote(message));
        }
        self.data
            .ok_or_else(|| ServiceError::remote(format!("empty response for {what}")))
    }
}

/// REST error body.
#[derive(Debug, Deserialize)]
struct RestError {
    message: String,
}

/// Maps a non-success HTTP response to a [`ServiceError::Remote`] of the form
/// `<status> <message>`.
pub(crate) fn http_error(status: StatusCode, body: &str) -> ServiceError {
    let message = serde_json::from_str::<RestError>(body)
        .ok()
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_default();
    ServiceError::remote(format!("{} {message}", status.as_u16()).trim_end().to_string())
}

/// Interprets the status of an organization membership check.
///
/// `None` means the status is not one of the documented answers.
pub(crate) fn membership(status: StatusCode) -> Option<bool> {
    match status {
        StatusCode::NO_CONTENT => Some(true),
        // 302 when the token's owner is not an org member, 404 when the user is not.
        StatusCode::FOUND | StatusCode::NOT_FOUND => Some(false),
        _ => None,
    }
}

fn found<T>(value: Option<T>, what: &str) -> Result<T, ServiceError> {
    value.ok_or_else(|| ServiceError::not_found(what))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ServiceError> {
    value.ok_or_else(|| ServiceError::transport(format!("malformed response: empty {field}")))
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    end_cursor: Option<String>,
    has_next_page: bool,
}

/// A paginated GraphQL connection. GitHub may return `null` nodes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Connection<T> {
    #[serde(default)]
    nodes: Vec<Option<T>>,
    #[serde(default)]
    page_info: PageInfo,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            page_info: PageInfo::default(),
        }
    }
}

impl<T> Connection<T> {
    fn next_cursor(&self) -> Result<Option<Cursor>, ServiceError> {
        if !self.page_info.has_next_page {
            return Ok(None);
        }
        match &self.page_info.end_cursor {
            Some(cursor) if !cursor.is_empty() => Ok(Some(Cursor::new(cursor.clone()))),
            _ => Err(ServiceError::transport(
                "malformed response: hasNextPage without endCursor",
            )),
        }
    }

    fn into_page<U>(
        self,
        mut convert: impl FnMut(T) -> Result<Option<U>, ServiceError>,
    ) -> Result<Page<U>, ServiceError> {
        let next = self.next_cursor()?;
        let mut items = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.into_iter().flatten() {
            if let Some(item) = convert(node)? {
                items.push(item);
            }
        }
        Ok(Page { items, next })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginNode {
    login: String,
}

// ---------------------------------------------------------------------------
// Pull requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ActorNode {
    #[serde(rename = "__typename")]
    typename: String,
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    name: String,
    owner: LoginNode,
}

#[derive(Debug, Deserialize)]
struct ProjectOwnerNode {
    // Absent for owner kinds other than Organization and User.
    #[serde(default)]
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectLinkNode {
    number: u64,
    owner: ProjectOwnerNode,
}

/// The `PullRequestFields` fragment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullRequestNode {
    id: String,
    number: u64,
    title: String,
    url: String,
    is_draft: bool,
    state: PullRequestState,
    author: Option<ActorNode>,
    repository: RepositoryNode,
    #[serde(default)]
    assignees: Connection<LoginNode>,
    #[serde(default, rename = "projectsV2")]
    projects: Connection<ProjectLinkNode>,
}

impl PullRequestNode {
    pub(crate) fn into_pull_request(
        self,
        project_item: Option<ProjectItemId>,
    ) -> Result<PullRequest, ServiceError> {
        let repository = RepositoryRef::new(
            required(Login::new(self.repository.owner.login), "repository owner")?,
            required(RepositoryName::new(self.repository.name), "repository name")?,
        );

        let assignees: BTreeSet<Login> = self
            .assignees
            .nodes
            .into_iter()
            .flatten()
            .filter_map(|node| Login::new(node.login))
            .collect();

        let projects = self
            .projects
            .nodes
            .into_iter()
            .flatten()
            .filter_map(|node| {
                Some(ProjectLink {
                    owner: Login::new(node.owner.login?)?,
                    number: ProjectNumber::new(node.number),
                })
            })
            .collect();

        Ok(PullRequest {
            id: required(PullRequestId::new(self.id), "pull request id")?,
            number: PullRequestNumber::new(self.number),
            title: self.title,
            url: self.url,
            author: author(self.author)?,
            is_draft: self.is_draft,
            state: self.state,
            repository,
            project_item,
            assignees,
            projects,
        })
    }
}

fn author(node: Option<ActorNode>) -> Result<Author, ServiceError> {
    let Some(node) = node else {
        return Ok(Author {
            login: required(Login::new(GHOST_LOGIN), "author login")?,
            kind: AuthorKind::Other,
        });
    };

    let kind = match node.typename.as_str() {
        "User" => AuthorKind::User,
        "Bot" => AuthorKind::Bot,
        _ => AuthorKind::Other,
    };
    Ok(Author {
        login: required(Login::new(node.login), "author login")?,
        kind,
    })
}

/// `repository.pullRequests` listing.
#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryPullRequestsData {
    repository: Option<RepositoryPullRequests>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryPullRequests {
    pull_requests: Connection<PullRequestNode>,
}

impl RepositoryPullRequestsData {
    pub(crate) fn into_page(self, what: &str) -> Result<Page<PullRequest>, ServiceError> {
        found(self.repository, what)?
            .pull_requests
            .into_page(|node| node.into_pull_request(None).map(Some))
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct OrganizationProject<T> {
    #[serde(rename = "projectV2")]
    project: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ProjectNode {
    id: String,
    number: u64,
    title: String,
}

/// `organization.projectV2` metadata.
#[derive(Debug, Deserialize)]
pub(crate) struct ProjectData {
    organization: Option<OrganizationProject<ProjectNode>>,
}

impl ProjectData {
    pub(crate) fn into_project(self, what: &str) -> Result<Project, ServiceError> {
        let node = found(found(self.organization, what)?.project, what)?;
        Ok(Project {
            id: required(ProjectId::new(node.id), "project id")?,
            number: ProjectNumber::new(node.number),
            title: node.title,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum ItemContent {
    PullRequest(Box<PullRequestNode>),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ProjectItemNode {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    content: Option<ItemContent>,
}

#[derive(Debug, Deserialize)]
struct ProjectItems {
    items: Connection<ProjectItemNode>,
}

/// `organization.projectV2.items` listing.
#[derive(Debug, Deserialize)]
pub(crate) struct ProjectItemsData {
    organization: Option<OrganizationProject<ProjectItems>>,
}

impl ProjectItemsData {
    /// Pull request items only; issues, draft issues, and redacted items are
    /// skipped.
    pub(crate) fn into_page(self, what: &str) -> Result<Page<PullRequest>, ServiceError> {
        found(found(self.organization, what)?.project, what)?
            .items
            .into_page(|item| {
                let (Some(ItemContent::PullRequest(node)), "PULL_REQUEST") =
                    (item.content, item.kind.as_str())
                else {
                    return Ok(None);
                };
                let item_id = required(ProjectItemId::new(item.id), "project item id")?;
                node.into_pull_request(Some(item_id)).map(Some)
            })
    }
}

// ---------------------------------------------------------------------------
// Users, teams, organizations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MemberNode {
    id: String,
    login: String,
}

#[derive(Debug, Deserialize)]
struct TeamNode {
    members: Connection<MemberNode>,
}

#[derive(Debug, Deserialize)]
struct OrganizationTeam {
    team: Option<TeamNode>,
}

/// `organization.team.members` listing.
#[derive(Debug, Deserialize)]
pub(crate) struct TeamMembersData {
    organization: Option<OrganizationTeam>,
}

impl TeamMembersData {
    pub(crate) fn into_page(self, what: &str) -> Result<Page<TeamMember>, ServiceError> {
        found(found(self.organization, what)?.team, what)?
            .members
            .into_page(|node| {
                Ok(Some(TeamMember {
                    login: required(Login::new(node.login), "member login")?,
                    id: required(UserId::new(node.id), "member id")?,
                }))
            })
    }
}

#[derive(Debug, Deserialize)]
struct UserOrganizations {
    organizations: Connection<LoginNode>,
}

/// `user.organizations` listing.
#[derive(Debug, Deserialize)]
pub(crate) struct UserOrganizationsData {
    user: Option<UserOrganizations>,
}

impl UserOrganizationsData {
    pub(crate) fn into_page(self, what: &str) -> Result<Page<Login>, ServiceError> {
        found(self.user, what)?
            .organizations
            .into_page(|node| Ok(Login::new(node.login)))
    }
}

#[derive(Debug, Deserialize)]
struct IdNode {
    id: String,
}

/// `user(login:)` lookup.
#[derive(Debug, Deserialize)]
pub(crate) struct LookupUserData {
    user: Option<IdNode>,
}

impl LookupUserData {
    pub(crate) fn into_user_id(self, what: &str) -> Result<UserId, ServiceError> {
        required(UserId::new(found(self.user, what)?.id), "user id")
    }
}

/// `viewer` query.
#[derive(Debug, Deserialize)]
pub(crate) struct ViewerData {
    viewer: LoginNode,
}

impl ViewerData {
    pub(crate) fn into_login(self) -> Result<Login, ServiceError> {
        required(Login::new(self.viewer.login), "viewer login")
    }
}
