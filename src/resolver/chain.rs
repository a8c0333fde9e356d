//! Priority-ordered strategy chain with per-candidate validation.

use std::fmt;

use tracing::{debug, info, instrument};
use url::Url;

use crate::http::HttpClient;

use super::ResolveError;
use super::strategies::default_strategies;
use super::utils::absolutize_url;
use super::validate::UrlFilter;

/// Markup plus the URL it was served from, handed to every strategy.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// Raw page markup.
    pub markup: &'a str,
    /// Post-redirect page URL, used to absolutize relative candidates.
    pub page_url: Option<&'a Url>,
}

impl<'a> PageContext<'a> {
    /// Creates a context.
    #[must_use]
    pub fn new(markup: &'a str, page_url: Option<&'a Url>) -> Self {
        Self { markup, page_url }
    }

    /// Makes `value` absolute against the page URL when one is known.
    pub(crate) fn absolutize(&self, value: &str) -> Option<String> {
        match self.page_url {
            Some(base) => absolutize_url(value, base),
            None => Some(value.to_string()),
        }
    }
}

/// Signature of a strategy: candidates in discovery order.
pub type ExtractFn = fn(&PageContext<'_>) -> Vec<String>;

/// A named, pure extraction heuristic.
#[derive(Clone, Copy)]
pub struct Strategy {
    name: &'static str,
    extract: ExtractFn,
}

impl Strategy {
    /// Wraps an extraction function under `name`.
    #[must_use]
    pub const fn new(name: &'static str, extract: ExtractFn) -> Self {
        Self { name, extract }
    }

    /// Strategy name used in logs and [`DownloadTarget::strategy`].
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the heuristic.
    #[must_use]
    pub fn candidates(&self, ctx: &PageContext<'_>) -> Vec<String> {
        (self.extract)(ctx)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Strategy").field(&self.name).finish()
    }
}

/// A candidate that passed the URL filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// The direct download URL.
    pub url: String,
    /// Always true for targets returned by the resolver.
    pub validated: bool,
    /// Name of the strategy that produced it.
    pub strategy: &'static str,
}

/// Outcome of running the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// First validated candidate, in strategy priority order.
    Found(DownloadTarget),
    /// Every strategy ran without producing a validated candidate.
    NotFound {
        /// Strategy names in the order they ran.
        strategies_tried: Vec<&'static str>,
    },
}

impl Resolution {
    /// Returns the resolved URL if found.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Found(target) => Some(&target.url),
            Self::NotFound { .. } => None,
        }
    }

    /// Consumes the resolution, returning the target if found.
    #[must_use]
    pub fn into_target(self) -> Option<DownloadTarget> {
        match self {
            Self::Found(target) => Some(target),
            Self::NotFound { .. } => None,
        }
    }
}

/// Runs strategies in order and returns the first validated candidate.
///
/// The chain itself is synchronous and pure over markup; [`resolve`](Self::resolve)
/// only adds the page fetch when markup is not supplied.
#[derive(Debug, Clone)]
pub struct Resolver {
    strategies: Vec<Strategy>,
    filter: UrlFilter,
    client: HttpClient,
}

impl Resolver {
    /// Creates a resolver with the built-in strategy chain.
    #[must_use]
    pub fn new(client: HttpClient, filter: UrlFilter) -> Self {
        Self {
            strategies: default_strategies(),
            filter,
            client,
        }
    }

    /// Replaces the strategy chain (add, remove, or reorder).
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// The active chain in priority order.
    #[must_use]
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// The filter applied to every candidate.
    #[must_use]
    pub fn filter(&self) -> &UrlFilter {
        &self.filter
    }

    /// Runs the chain over already-fetched markup.
    #[must_use]
    pub fn resolve_markup(&self, markup: &str, page_url: Option<&Url>) -> Resolution {
        let ctx = PageContext::new(markup, page_url);
        let mut strategies_tried = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            strategies_tried.push(strategy.name());
            let candidates = strategy.candidates(&ctx);
            debug!(
                strategy = strategy.name(),
                candidates = candidates.len(),
                "strategy ran"
            );

            for candidate in candidates {
                match self.filter.check(&candidate) {
                    Ok(()) => {
                        info!(strategy = strategy.name(), url = %candidate, "download URL resolved");
                        return Resolution::Found(DownloadTarget {
                            url: candidate,
                            validated: true,
                            strategy: strategy.name(),
                        });
                    }
                    Err(rejection) => {
                        debug!(
                            strategy = strategy.name(),
                            url = %candidate,
                            %rejection,
                            "candidate rejected"
                        );
                    }
                }
            }
        }

        debug!(tried = strategies_tried.len(), "no strategy produced a valid URL");
        Resolution::NotFound { strategies_tried }
    }

    /// Resolves the download URL for `page_url`, fetching the page first when
    /// `markup` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidPageUrl`] if `page_url` does not parse and
    /// [`ResolveError::PageUnavailable`] if the page fetch fails. Strategy
    /// exhaustion is `Ok(Resolution::NotFound)`.
    #[instrument(skip(self, markup), fields(markup_supplied = markup.is_some()))]
    pub async fn resolve(
        &self,
        page_url: &str,
        markup: Option<&str>,
    ) -> Result<Resolution, ResolveError> {
        let parsed = Url::parse(page_url).map_err(|_| ResolveError::invalid_page_url(page_url))?;

        if let Some(markup) = markup {
            return Ok(self.resolve_markup(markup, Some(&parsed)));
        }

        let page = self
            .client
            .fetch_page(page_url)
            .await
            .map_err(|source| ResolveError::page_unavailable(page_url, source))?;
        let base = Url::parse(&page.final_url).unwrap_or(parsed);
        Ok(self.resolve_markup(&page.raw_markup, Some(&base)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::config::EngineConfig;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    fn resolver() -> Resolver {
        let client = HttpClient::new(&EngineConfig::deterministic()).unwrap();
        Resolver::new(client, UrlFilter::default())
    }

    #[test]
    fn test_state_object_beats_unrelated_href() {
        let markup = r#"<html><body>
            <a href="http://ads.example/track">ad</a>
            <a href="https://mirror.example/download/other.mp4">mirror</a>
            <script>window.yunData = {"dlink":"http://cdn.example/x"};</script>
        </body></html>"#;
        let resolution = resolver().resolve_markup(markup, None);
        assert_eq!(
            resolution,
            Resolution::Found(DownloadTarget {
                url: "http://cdn.example/x".to_string(),
                validated: true,
                strategy: "embedded-state",
            })
        );
    }

    #[test]
    fn test_rejected_candidates_fall_through_to_next_strategy() {
        let markup = r#"
            <script>var cfg = {"url": "https://cdn.example/app.js"};</script>
            <a href="https://files.example/download/report.pdf">get</a>
        "#;
        let resolution = resolver().resolve_markup(markup, None);
        let target = resolution.into_target().unwrap();
        assert_eq!(target.url, "https://files.example/download/report.pdf");
        assert_eq!(target.strategy, "media-link");
    }

    #[test]
    fn test_not_found_lists_strategies() {
        let resolution = resolver().resolve_markup("<html><p>expired</p></html>", None);
        assert_eq!(
            resolution,
            Resolution::NotFound {
                strategies_tried: vec![
                    "embedded-state",
                    "linked-data",
                    "script-variable",
                    "media-link",
                    "api-endpoint"
                ]
            }
        );
        assert_eq!(resolution.url(), None);
    }

    #[test]
    fn test_custom_strategy_order() {
        fn fixed(_: &PageContext<'_>) -> Vec<String> {
            vec!["https://fixed.example/download/1".to_string()]
        }
        let markup = r#"window.s = {"dlink":"http://cdn.example/x"};"#;
        let resolver = resolver().with_strategies(vec![
            Strategy::new("fixed", fixed),
            Strategy::new("embedded-state", crate::resolver::strategies::embedded_state),
        ]);
        assert_eq!(resolver.strategies().len(), 2);
        let target = resolver.resolve_markup(markup, None).into_target().unwrap();
        assert_eq!(target.strategy, "fixed");
    }

    #[tokio::test]
    async fn test_resolve_invalid_page_url() {
        let result = resolver().resolve("not a url", Some("")).await;
        assert!(matches!(result, Err(ResolveError::InvalidPageUrl { .. })));
    }

    #[tokio::test]
    async fn test_resolve_refetches_when_markup_missing() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/s/1abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<script>fetch("/api/download?surl=1abc")</script>"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let page_url = format!("{}/s/1abc", mock_server.uri());
        let resolution = resolver().resolve(&page_url, None).await.unwrap();
        assert_eq!(
            resolution.url(),
            Some(format!("{}/api/download?surl=1abc", mock_server.uri()).as_str())
        );
    }

    #[tokio::test]
    async fn test_resolve_page_unavailable() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let page_url = format!("{}/s/gone", mock_server.uri());
        let result = resolver().resolve(&page_url, None).await;
        match result {
            Err(ResolveError::PageUnavailable { source, .. }) => {
                assert_eq!(source.status_code(), Some(404));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
