//! prsync GitHub infrastructure adapter.
//!
//! Implements [`board::RepositoryService`] over GitHub's GraphQL API (boards,
//! pull requests, teams, users, and every mutation) and one REST call (the
//! organization membership check, which GraphQL does not expose for private
//! memberships).
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Transport
//! details (authentication, timeouts, pagination cursors, the shape of GitHub's
//! responses and errors) are handled here; the [`board`] crate never sees them.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | `client` | [`GithubClient`] and its `RepositoryService` implementation |
//! | `endpoint` | [`ApiEndpoint`], the configurable API base URL |
//! | `queries` | GraphQL documents |
//! | `wire` | Response shapes and their conversion into `board` types |
//! | `pages` | Page sources for the paginated listings |

mod client;
mod endpoint;
mod pages;
mod queries;
mod wire;

pub use client::{ClientError, GithubClient, REQUEST_TIMEOUT};
pub use endpoint::{ApiEndpoint, InvalidEndpoint, DEFAULT_API_URL};
