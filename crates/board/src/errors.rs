//! Error types for the board synchronization domain.
//!
//! [`ServiceError`] is what a [`crate::RepositoryService`] implementation
//! reports. [`SyncError`] is what a run reports: the service failure plus a
//! description of what the run was doing when it happened.
//!
//! Nothing in this crate recovers from a [`ServiceError`]. Every remote failure
//! aborts the current operation and is surfaced verbatim to the caller.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Remote failures
// ---------------------------------------------------------------------------

/// A failed call to the remote repository service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The project, team, repository, or user does not exist (or is not
    /// visible to the credentials in use).
    #[error("{what} not found")]
    NotFound {
        /// Description of the missing object (e.g. `"team acme/platform"`).
        what: String,
    },

    /// The service answered a well-formed request with structured errors.
    #[error("{message}")]
    Remote {
        /// The service's own error messages, one per line.
        message: String,
    },

    /// The request could not be completed (connection, timeout, decoding).
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

impl ServiceError {
    /// Shorthand for [`ServiceError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Shorthand for [`ServiceError::Remote`].
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Shorthand for [`ServiceError::Transport`].
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns `true` for [`ServiceError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Errors that terminate a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote call failed while the run was performing `action`.
    #[error("{action}: {source}")]
    Service {
        /// What the run was doing (e.g. `"error fetching project pull requests"`).
        action: String,
        /// The underlying remote failure.
        #[source]
        source: ServiceError,
    },
}

impl SyncError {
    /// Wraps a [`ServiceError`] with a description of the failed action.
    pub fn service(action: impl Into<String>, source: ServiceError) -> Self {
        Self::Service {
            action: action.into(),
            source,
        }
    }

    /// The underlying remote failure.
    pub fn service_error(&self) -> &ServiceError {
        match self {
            Self::Service { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_error_prefixes_the_action() {
        let err = SyncError::service(
            "error fetching project pull requests",
            ServiceError::not_found("project acme/7"),
        );
        assert_eq!(
            err.to_string(),
            "error fetching project pull requests: project acme/7 not found"
        );
        assert!(err.service_error().is_not_found());
    }
}
