//! The three engine operations over one shared HTTP client.
//!
//! [`ShareEngine`] is what callers (the orchestrator, the CLI, a web layer)
//! drive: fetch the share page and name the file, locate the direct URL, then
//! stream it to disk.

use std::path::Path;

use tracing::instrument;

use crate::config::EngineConfig;
use crate::download::{TransferEngine, TransferOptions, TransferResult};
use crate::extract::FilenameExtractor;
use crate::http::{HttpClient, HttpError, PageSnapshot};
use crate::resolver::{Resolution, ResolveError, Resolver, UrlFilter};

/// File name and page details from the share page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Sanitized, extension-bearing file name.
    pub filename: String,
    /// Post-redirect share page URL.
    pub final_url: String,
    /// Status code of the page response.
    pub status_code: u16,
    /// The fetched page, reusable by the resolver.
    pub page: PageSnapshot,
}

impl FileInfo {
    /// Length of the fetched markup in bytes.
    #[must_use]
    pub fn content_length(&self) -> usize {
        self.page.raw_markup.len()
    }
}

/// Link-resolution engine: page fetch, filename extraction, URL resolution and transfer.
#[derive(Debug, Clone)]
pub struct ShareEngine {
    client: HttpClient,
    extractor: FilenameExtractor,
    resolver: Resolver,
    transfer: TransferEngine,
}

impl ShareEngine {
    /// Builds an engine and its HTTP client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Build`] if the HTTP client cannot be constructed.
    pub fn new(config: EngineConfig) -> Result<Self, HttpError> {
        let client = HttpClient::new(&config)?;
        Ok(Self::with_client(&config, client))
    }

    /// Builds an engine around an existing client (custom pacing, shared jar).
    #[must_use]
    pub fn with_client(config: &EngineConfig, client: HttpClient) -> Self {
        Self {
            extractor: FilenameExtractor::new(config.site_keywords.clone()),
            resolver: Resolver::new(client.clone(), UrlFilter::new(&config.site_keywords)),
            transfer: TransferEngine::new(client.clone(), config.html_error_threshold),
            client,
        }
    }

    /// Replaces the resolver, e.g. to run a custom strategy chain.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// The resolver in use.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Fetches the share page and extracts the file name.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the page cannot be fetched or answers non-2xx.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn extract_file_info(&self, url: &str) -> Result<FileInfo, HttpError> {
        let page = self.client.fetch_page(url).await?;
        let filename = self.extractor.extract(&page.raw_markup);
        Ok(FileInfo {
            filename,
            final_url: page.final_url.clone(),
            status_code: page.status_code,
            page,
        })
    }

    /// Locates the direct download URL, re-fetching the page if no content is given.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the page URL is invalid or the re-fetch
    /// fails. Exhausting every strategy is `Ok(Resolution::NotFound)`.
    pub async fn resolve_download_url(
        &self,
        page_url: &str,
        page_content: Option<&str>,
    ) -> Result<Resolution, ResolveError> {
        self.resolver.resolve(page_url, page_content).await
    }

    /// Streams `download_url` to `destination_dir/filename`.
    pub async fn fetch_file(
        &self,
        download_url: &str,
        filename: &str,
        destination_dir: &Path,
        options: &TransferOptions,
    ) -> TransferResult {
        self.transfer
            .transfer(download_url, filename, destination_dir, options)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    fn engine() -> ShareEngine {
        ShareEngine::new(EngineConfig::deterministic()).unwrap()
    }

    #[tokio::test]
    async fn test_extract_file_info_follows_redirect_and_names_file() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/s/short"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/sharing/link?surl=abc"),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sharing/link"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><title>Holiday Clip.mkv</title></html>", "text/html"),
            )
            .mount(&mock_server)
            .await;

        let info = engine()
            .extract_file_info(&format!("{}/s/short", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(info.filename, "Holiday Clip.mkv");
        assert_eq!(info.status_code, 200);
        assert!(info.final_url.ends_with("/sharing/link?surl=abc"));
        assert_eq!(info.content_length(), 44);
    }

    #[tokio::test]
    async fn test_extract_file_info_surfaces_status() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&mock_server)
            .await;

        let error = engine()
            .extract_file_info(&format!("{}/s/gone", mock_server.uri()))
            .await
            .unwrap_err();
        assert_eq!(error.status_code(), Some(410));
    }

    #[tokio::test]
    async fn test_resolve_with_supplied_content_does_not_fetch() {
        let markup = r#"<script>window.yunData = {"dlink":"http://cdn.example/x"};</script>"#;
        let resolution = engine()
            .resolve_download_url("https://www.terabox.com/s/1abc", Some(markup))
            .await
            .unwrap();
        assert_eq!(resolution.url(), Some("http://cdn.example/x"));
    }

    #[tokio::test]
    async fn test_fetch_file_end_to_end() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/file/a.bin"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![9u8; 64], "application/octet-stream"),
            )
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let result = engine()
            .fetch_file(
                &format!("{}/file/a.bin", mock_server.uri()),
                "a.bin",
                temp_dir.path(),
                &TransferOptions::default(),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.bytes_written, 64);
    }
}
