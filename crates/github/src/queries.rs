//! GraphQL documents.
//!
//! Every document takes its inputs as variables; nothing is interpolated into
//! the query text. Listing queries take `$first` and `$after` and select
//! `pageInfo { endCursor hasNextPage }` on the paginated connection.

/// A named GraphQL document. The name only appears in logs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Document {
    pub name: &'static str,
    pub text: &'static str,
}

// Expands to a string literal so it can be spliced with `concat!`.
macro_rules! pull_request_fragment {
    () => {
        r#"
fragment PullRequestFields on PullRequest {
  id
  number
  title
  url
  isDraft
  state
  author { __typename login }
  repository { name owner { login } }
  assignees(first: 100) { nodes { login } }
  projectsV2(first: 100) {
    nodes {
      number
      owner {
        ... on Organization { login }
        ... on User { login }
      }
    }
  }
}
"#
    };
}

pub(crate) const VIEWER: Document = Document {
    name: "viewer",
    text: "query { viewer { login } }",
};

pub(crate) const PROJECT: Document = Document {
    name: "project",
    text: r#"
query($owner: String!, $number: Int!) {
  organization(login: $owner) {
    projectV2(number: $number) { id number title }
  }
}
"#,
};

pub(crate) const PROJECT_ITEMS: Document = Document {
    name: "projectItems",
    text: concat!(
        r#"
query($owner: String!, $number: Int!, $first: Int!, $after: String) {
  organization(login: $owner) {
    projectV2(number: $number) {
      items(first: $first, after: $after) {
        nodes {
          id
          type
          content {
            __typename
            ... on PullRequest { ...PullRequestFields }
          }
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#,
        pull_request_fragment!()
    ),
};

pub(crate) const REPOSITORY_PULL_REQUESTS: Document = Document {
    name: "repositoryPullRequests",
    text: concat!(
        r#"
query($owner: String!, $name: String!, $states: [PullRequestState!], $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(states: $states, first: $first, after: $after, orderBy: {field: CREATED_AT, direction: ASC}) {
      nodes { ...PullRequestFields }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#,
        pull_request_fragment!()
    ),
};

pub(crate) const TEAM_MEMBERS: Document = Document {
    name: "teamMembers",
    text: r#"
query($org: String!, $slug: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    team(slug: $slug) {
      members(first: $first, after: $after) {
        nodes { id login }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#,
};

pub(crate) const USER_ORGANIZATIONS: Document = Document {
    name: "userOrganizations",
    text: r#"
query($login: String!, $first: Int!, $after: String) {
  user(login: $login) {
    organizations(first: $first, after: $after) {
      nodes { login }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#,
};

pub(crate) const LOOKUP_USER: Document = Document {
    name: "lookupUser",
    text: "query($login: String!) { user(login: $login) { id } }",
};

pub(crate) const ADD_PROJECT_ITEM: Document = Document {
    name: "addProjectV2ItemById",
    text: r#"
mutation($projectId: ID!, $contentId: ID!) {
  addProjectV2ItemById(input: {projectId: $projectId, contentId: $contentId}) {
    item { id }
  }
}
"#,
};

pub(crate) const DELETE_PROJECT_ITEM: Document = Document {
    name: "deleteProjectV2Item",
    text: r#"
mutation($projectId: ID!, $itemId: ID!) {
  deleteProjectV2Item(input: {projectId: $projectId, itemId: $itemId}) {
    deletedItemId
  }
}
"#,
};

pub(crate) const ADD_ASSIGNEES: Document = Document {
    name: "addAssigneesToAssignable",
    text: r#"
mutation($assignableId: ID!, $assigneeIds: [ID!]!) {
  addAssigneesToAssignable(input: {assignableId: $assignableId, assigneeIds: $assigneeIds}) {
    clientMutationId
  }
}
"#,
};
