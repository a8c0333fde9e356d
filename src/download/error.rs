//! Error types for the transfer engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur while transferring a resolved file.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The request failed or the server answered non-2xx.
    #[error("{source}")]
    Http {
        /// Underlying client error (carries the status code and reason).
        #[source]
        source: HttpError,
    },

    /// The server returned a small HTML document instead of the file.
    #[error(
        "server returned an HTML page instead of the file ({bytes} bytes, {content_type}): {excerpt}"
    )]
    ErrorPage {
        /// The download URL.
        url: String,
        /// Response content type.
        content_type: String,
        /// Bytes of the page observed.
        bytes: u64,
        /// Leading text of the page, whitespace collapsed.
        excerpt: String,
    },

    /// A `206` response covered only part of the file.
    #[error("server returned a partial range ({content_range}) instead of the full file from {url}")]
    PartialContent {
        /// The download URL.
        url: String,
        /// The `Content-Range` header as sent.
        content_range: String,
    },

    /// The body ended before the announced range was complete.
    #[error("transfer from {url} ended after {bytes_written} of {expected} bytes")]
    Incomplete {
        /// The download URL.
        url: String,
        /// Bytes received.
        bytes_written: u64,
        /// Bytes announced by the range.
        expected: u64,
    },

    /// The transfer produced no bytes.
    #[error("empty response body from {url}")]
    EmptyBody {
        /// The download URL.
        url: String,
    },

    /// File system error (create dir, create file, write, flush).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The body stream broke off mid-transfer.
    #[error("transfer from {url} interrupted after {bytes_written} bytes: {source}")]
    Stream {
        /// The download URL.
        url: String,
        /// Bytes written before the failure.
        bytes_written: u64,
        /// Underlying body error.
        #[source]
        source: reqwest::Error,
    },
}

impl TransferError {
    /// Wraps a client error.
    #[must_use]
    pub fn http(source: HttpError) -> Self {
        Self::Http { source }
    }

    /// Creates an IO error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a stream interruption error.
    #[must_use]
    pub fn stream(url: &str, bytes_written: u64, source: reqwest::Error) -> Self {
        Self::Stream {
            url: url.to_string(),
            bytes_written,
            source,
        }
    }

    /// Returns the HTTP status code for status failures.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { source } => source.status_code(),
            _ => None,
        }
    }
}
