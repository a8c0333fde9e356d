//! Error types for the HTTP client wrapper.

use thiserror::Error;

/// Errors surfaced by [`HttpClient`](super::HttpClient).
#[derive(Debug, Error)]
pub enum HttpError {
    /// The URL is malformed or not HTTP(S).
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// Connection-level failure (DNS, refused, reset) after all attempts.
    #[error("connection failed for {url} after {attempts} attempt(s): {source}")]
    Connect {
        /// The URL being fetched.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Certificate or handshake failure.
    #[error(
        "TLS failure for {url}: {source}\n  Suggestion: retry with certificate validation disabled (--insecure) if you trust the host"
    )]
    Tls {
        /// The URL being fetched.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded its timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} {reason} for {url}")]
    Status {
        /// The URL that returned the status.
        url: String,
        /// Numeric status code.
        status: u16,
        /// Canonical reason phrase.
        reason: String,
    },

    /// Any other request failure (redirect loop, body decode, ...).
    #[error("request to {url} failed: {source}")]
    Request {
        /// The URL being fetched.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Build {
        /// Builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl HttpError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a status error.
    pub fn status(url: impl Into<String>, status: u16, reason: impl Into<String>) -> Self {
        Self::Status {
            url: url.into(),
            status,
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Classifies a send/body error from reqwest.
    pub fn from_transport(url: impl Into<String>, attempts: u32, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else if source.is_connect() && is_tls_error(&source) {
            Self::Tls { url, source }
        } else if source.is_connect() {
            Self::Connect {
                url,
                attempts,
                source,
            }
        } else {
            Self::Request { url, source }
        }
    }

    /// Returns the HTTP status code when this is a status error.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Checks whether a transport error looks like a certificate/handshake failure.
///
/// reqwest does not expose a TLS predicate, so the error chain text is inspected.
fn is_tls_error(error: &reqwest::Error) -> bool {
    let mut text = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(inner) = source {
        text.push(' ');
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    let text = text.to_lowercase();
    text.contains("certificate")
        || text.contains("tls")
        || text.contains("ssl")
        || text.contains("handshake")
}
