//! Error types for download-URL resolution.
//!
//! Strategy exhaustion is not an error: it is reported as
//! [`Resolution::NotFound`](super::Resolution::NotFound). These variants cover
//! the cases where the chain could not run at all.

use thiserror::Error;

use crate::http::HttpError;

/// Errors that prevent the strategy chain from running.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The page URL could not be parsed.
    #[error("invalid page URL '{url}'\n  Suggestion: pass the full share link including https://")]
    InvalidPageUrl {
        /// The rejected page URL.
        url: String,
    },

    /// Markup was not supplied and re-fetching the page failed.
    #[error("share page unavailable: {source}")]
    PageUnavailable {
        /// The page URL that was fetched.
        url: String,
        /// Underlying fetch failure.
        #[source]
        source: HttpError,
    },
}

impl ResolveError {
    /// Creates an `InvalidPageUrl` error.
    #[must_use]
    pub fn invalid_page_url(url: &str) -> Self {
        Self::InvalidPageUrl {
            url: url.to_string(),
        }
    }

    /// Creates a `PageUnavailable` error.
    #[must_use]
    pub fn page_unavailable(url: &str, source: HttpError) -> Self {
        Self::PageUnavailable {
            url: url.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_page_url_display_has_suggestion() {
        let msg = ResolveError::invalid_page_url("not a url").to_string();
        assert!(msg.contains("not a url"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_page_unavailable_carries_status() {
        let error = ResolveError::page_unavailable(
            "https://www.terabox.com/s/1x",
            HttpError::status("https://www.terabox.com/s/1x", 404, "Not Found"),
        );
        assert!(error.to_string().contains("404"));
    }
}
