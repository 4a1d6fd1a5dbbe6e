//! The GitHub API base URL.

use std::str::FromStr;

use reqwest::Url;
use thiserror::Error;

/// Base URL used when none is configured.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Error returned when a string is not a usable API base URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid GitHub API URL {value:?}: {reason}")]
pub struct InvalidEndpoint {
    value: String,
    reason: String,
}

/// Base URL of a GitHub (or GitHub Enterprise) API.
///
/// GraphQL requests go to `<base>/graphql`; REST paths are appended as
/// segments. A trailing `/` in the configured value is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    url: Url,
}

impl ApiEndpoint {
    /// The base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The base URL with `segments` appended to its path.
    pub fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.url.clone();
        // Only cannot-be-a-base URLs have no segments, and parsing rejects those.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// The GraphQL endpoint.
    pub fn graphql(&self) -> Url {
        self.join(&["graphql"])
    }
}

impl FromStr for ApiEndpoint {
    type Err = InvalidEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| InvalidEndpoint {
            value: s.to_string(),
            reason,
        };

        let url = Url::parse(s.trim_end_matches('/')).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }
        Ok(Self { url })
    }
}

impl std::fmt::Display for ApiEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str().trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::public("https://api.github.com", "https://api.github.com/graphql")]
    #[case::trailing_slash("https://api.github.com/", "https://api.github.com/graphql")]
    #[case::enterprise("https://ghe.example.com/api", "https://ghe.example.com/api/graphql")]
    #[case::enterprise_trailing_slash("https://ghe.example.com/api/", "https://ghe.example.com/api/graphql")]
    fn graphql_endpoint_is_under_the_base(#[case] base: &str, #[case] expected: &str) {
        let endpoint: ApiEndpoint = base.parse().unwrap();
        assert_eq!(endpoint.graphql().as_str(), expected);
    }

    #[test]
    fn rest_segments_are_escaped() {
        let endpoint: ApiEndpoint = "https://ghe.example.com/api/".parse().unwrap();
        let url = endpoint.join(&["orgs", "acme corp", "members", "alice"]);
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/orgs/acme%20corp/members/alice"
        );
    }

    #[test]
    fn display_drops_the_trailing_slash() {
        let endpoint: ApiEndpoint = "https://api.github.com/".parse().unwrap();
        assert_eq!(endpoint.to_string(), DEFAULT_API_URL);
        assert_eq!(DEFAULT_API_URL.parse::<ApiEndpoint>().unwrap(), endpoint);
    }

    #[rstest]
    #[case::not_a_url("api.github.com")]
    #[case::wrong_scheme("ftp://api.github.com")]
    #[case::opaque("mailto:ops@example.com")]
    fn rejects_unusable_urls(#[case] value: &str) {
        assert!(value.parse::<ApiEndpoint>().is_err());
    }
}
