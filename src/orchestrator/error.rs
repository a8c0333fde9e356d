//! Error types for orchestrator operations.

use std::path::PathBuf;

use thiserror::Error;

use super::status::{RequestId, RequestState};

/// Reasons a submission is rejected before any pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The source URL does not parse.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
    },

    /// The URL is not HTTP(S).
    #[error("unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme {
        /// The rejected input.
        url: String,
        /// The scheme found.
        scheme: String,
    },

    /// The host is not one of the accepted share hosts.
    #[error("host '{host}' is not an accepted share host\n  Suggestion: {suggestion}")]
    HostNotAllowed {
        /// The rejected host.
        host: String,
        /// How to fix the issue.
        suggestion: String,
    },
}

impl SubmitError {
    /// Creates a `HostNotAllowed` error.
    #[must_use]
    pub fn host_not_allowed(host: &str) -> Self {
        Self::HostNotAllowed {
            host: host.to_string(),
            suggestion: "use a share link from a supported host, or allow any host".to_string(),
        }
    }
}

/// Reasons a completed file cannot be handed out.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// No request with this id, or its file is gone.
    #[error("no downloadable file for request {id}")]
    NotFound {
        /// The requested id.
        id: RequestId,
    },

    /// The request has not completed.
    #[error("request {id} is not ready (state: {state})")]
    NotReady {
        /// The requested id.
        id: RequestId,
        /// Current state.
        state: RequestState,
    },

    /// The completed file could not be opened.
    #[error("IO error opening {path}: {source}")]
    Io {
        /// The recorded file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a file cannot be discarded.
#[derive(Debug, Error)]
pub enum DiscardError {
    /// Nothing exists at the path.
    #[error("file not found: {path}")]
    NotFound {
        /// The requested path.
        path: PathBuf,
    },

    /// The path resolves outside the download directory.
    #[error("refusing to delete {path}: outside the download directory")]
    OutsideDownloadDir {
        /// The requested path.
        path: PathBuf,
    },

    /// Deletion failed.
    #[error("IO error deleting {path}: {source}")]
    Io {
        /// The requested path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
