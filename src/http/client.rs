//! Browser-like HTTP client with bounded retry and pluggable pacing.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Response};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::HttpError;
use super::pacing::{PacingPolicy, RequestKind, pacing_from_config};
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use crate::config::EngineConfig;
use crate::user_agent::BrowserIdentity;

/// Maximum redirect hops followed when `follow_redirects` is set.
const MAX_REDIRECTS: usize = 10;

/// Per-request options for [`HttpClient::fetch`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// HTTP method; only GET and HEAD are retried.
    pub method: Method,
    /// Headers applied after (and overriding) the identity headers.
    pub extra_headers: HeaderMap,
    /// Follow 3xx responses.
    pub follow_redirects: bool,
    /// Overrides the client's default timeout for `kind`.
    pub timeout: Option<Duration>,
    /// Page or transfer; selects pacing and the default timeout.
    pub kind: RequestKind,
}

impl FetchOptions {
    /// GET for a share page, following redirects.
    #[must_use]
    pub fn page() -> Self {
        Self {
            method: Method::GET,
            extra_headers: HeaderMap::new(),
            follow_redirects: true,
            timeout: None,
            kind: RequestKind::Page,
        }
    }

    /// GET for a file body, following redirects.
    #[must_use]
    pub fn transfer() -> Self {
        Self {
            kind: RequestKind::Transfer,
            ..Self::page()
        }
    }

    /// Adds an extra header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.insert(name, value);
        self
    }

    /// Sets whether redirects are followed.
    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fetched share page. Owned by one resolution and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    /// URL after redirects.
    pub final_url: String,
    /// Response body as text.
    pub raw_markup: String,
    /// HTTP status of the final response.
    pub status_code: u16,
}

/// Request-issuing facility shared by the resolver and transfer engine.
///
/// Holds two reqwest clients over one cookie jar, one following redirects
/// and one not, since reqwest fixes the redirect policy per client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    redirecting: Client,
    direct: Client,
    retry_policy: RetryPolicy,
    pacing: Arc<dyn PacingPolicy>,
    page_timeout: Duration,
    transfer_timeout: Duration,
}

impl HttpClient {
    /// Creates a client from engine configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Build`] if the TLS backend cannot be initialized.
    pub fn new(config: &EngineConfig) -> Result<Self, HttpError> {
        Self::with_pacing(config, pacing_from_config(&config.pacing))
    }

    /// Creates a client with an explicit pacing policy.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Build`] if the TLS backend cannot be initialized.
    pub fn with_pacing(
        config: &EngineConfig,
        pacing: Arc<dyn PacingPolicy>,
    ) -> Result<Self, HttpError> {
        let jar = Arc::new(Jar::default());
        let redirecting = build_client(config, Arc::clone(&jar), true)
            .map_err(|source| HttpError::Build { source })?;
        let direct =
            build_client(config, jar, false).map_err(|source| HttpError::Build { source })?;
        if !config.verify_tls {
            warn!("certificate validation disabled; upstream certificates are not verified");
        }
        Ok(Self {
            redirecting,
            direct,
            retry_policy: RetryPolicy::new(config.max_attempts, config.retry_base_delay),
            pacing,
            page_timeout: config.page_timeout,
            transfer_timeout: config.transfer_timeout,
        })
    }

    /// Issues a request with the browser identity headers applied.
    ///
    /// Connection-level failures on GET/HEAD are retried up to the configured
    /// attempt bound; a rotating pacing policy picks a new identity for each
    /// attempt. Non-2xx responses are returned as [`HttpError::Status`].
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for invalid URLs, connection/TLS failures,
    /// timeouts and non-success statuses.
    #[instrument(skip(self, options), fields(url = %url, kind = ?options.kind))]
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Response, HttpError> {
        let parsed = parse_http_url(url)?;

        let delay = self.pacing.pre_request_delay(options.kind);
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis(), "pacing request");
            tokio::time::sleep(delay).await;
        }

        let client = if options.follow_redirects {
            &self.redirecting
        } else {
            &self.direct
        };
        let timeout = options.timeout.unwrap_or(match options.kind {
            RequestKind::Page => self.page_timeout,
            RequestKind::Transfer => self.transfer_timeout,
        });
        let retryable = options.method == Method::GET || options.method == Method::HEAD;

        let mut previous: Option<BrowserIdentity> = None;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let identity = self.pacing.identity(attempt, previous.as_ref());
            previous = Some(identity);

            let mut headers = identity.headers();
            for (name, value) in &options.extra_headers {
                headers.insert(name.clone(), value.clone());
            }

            let sent = client
                .request(options.method.clone(), parsed.clone())
                .headers(headers)
                .timeout(timeout)
                .send()
                .await;

            match sent {
                Ok(response) => return ensure_success(url, response),
                Err(source) => {
                    let error = HttpError::from_transport(url, attempt, source);
                    if !retryable {
                        return Err(error);
                    }
                    match self
                        .retry_policy
                        .should_retry(classify_error(&error), attempt)
                    {
                        RetryDecision::Retry {
                            delay,
                            attempt: next,
                        } => {
                            warn!(
                                error = %error,
                                next_attempt = next,
                                delay_ms = delay.as_millis(),
                                "request failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            debug!(reason = %reason, "not retrying");
                            return Err(error);
                        }
                    }
                }
            }
        }
    }

    /// Fetches a page and reads its body as text.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`fetch`](Self::fetch), plus
    /// [`HttpError::Request`]/[`HttpError::Timeout`] if the body read fails.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_page(&self, url: &str) -> Result<PageSnapshot, HttpError> {
        let response = self.fetch(url, &FetchOptions::page()).await?;
        let final_url = response.url().to_string();
        let status_code = response.status().as_u16();
        let raw_markup = response
            .text()
            .await
            .map_err(|source| HttpError::from_transport(url, 1, source))?;

        info!(
            final_url = %final_url,
            status = status_code,
            bytes = raw_markup.len(),
            "fetched share page"
        );

        Ok(PageSnapshot {
            final_url,
            raw_markup,
            status_code,
        })
    }

    /// Returns the retry policy in use.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

fn parse_http_url(url: &str) -> Result<Url, HttpError> {
    let parsed = Url::parse(url).map_err(|_| HttpError::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(HttpError::invalid_url(url));
    }
    Ok(parsed)
}

fn ensure_success(url: &str, response: Response) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    debug!(status = status.as_u16(), "non-success status");
    Err(HttpError::status(
        url,
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status"),
    ))
}

fn build_client(
    config: &EngineConfig,
    jar: Arc<Jar>,
    follow_redirects: bool,
) -> Result<Client, reqwest::Error> {
    let redirect = if follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .gzip(true)
        .deflate(true)
        .cookie_provider(jar)
        .redirect(redirect)
        .danger_accept_invalid_certs(!config.verify_tls)
        .build()
}
