//! Integration tests for the resolver module.
//!
//! Tests the full resolution flow through the public API.

use sharegrab_core::EngineConfig;
use sharegrab_core::http::HttpClient;
use sharegrab_core::resolver::{
    PageContext, Resolution, ResolveError, Resolver, Strategy, UrlFilter, default_strategies,
    strategies,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::share_page;
use support::socket_guard::start_mock_server_or_skip;

fn resolver() -> Resolver {
    let config = EngineConfig::deterministic();
    let client = HttpClient::new(&config).unwrap();
    Resolver::new(client, UrlFilter::new(&config.site_keywords))
}

#[tokio::test]
async fn test_resolve_fetches_page_when_markup_missing() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let download_url = format!("{}/file/clip.mp4?sign=abc", mock_server.uri());
    Mock::given(method("GET"))
        .and(path("/s/1abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(share_page("clip.mp4", &download_url), "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolution = resolver()
        .resolve(&format!("{}/s/1abc", mock_server.uri()), None)
        .await
        .unwrap();

    let target = resolution.into_target().unwrap();
    assert_eq!(target.url, download_url);
    assert_eq!(target.strategy, "embedded-state");
    assert!(target.validated);
}

#[tokio::test]
async fn test_relative_links_resolve_against_post_redirect_url() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/s/short"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/sharing/page"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sharing/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><body><a class="btn" href="media/clip.mkv">Get</a></body></html>"#,
            "text/html",
        ))
        .mount(&mock_server)
        .await;

    let resolution = resolver()
        .resolve(&format!("{}/s/short", mock_server.uri()), None)
        .await
        .unwrap();

    assert_eq!(
        resolution.url(),
        Some(format!("{}/sharing/media/clip.mkv", mock_server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_linked_data_content_url_is_used_when_no_state_object() {
    let markup = r#"<html><head>
        <script type="application/ld+json">
          {"@context": "https://schema.org", "@type": "VideoObject",
           "name": "Trip", "contentUrl": "/stream/trip.mp4"}
        </script>
        </head></html>"#;

    let resolution = resolver()
        .resolve("https://www.terabox.com/s/1trip", Some(markup))
        .await
        .unwrap();

    let target = resolution.into_target().unwrap();
    assert_eq!(target.url, "https://www.terabox.com/stream/trip.mp4");
    assert_eq!(target.strategy, "linked-data");
}

#[tokio::test]
async fn test_api_endpoint_is_last_resort() {
    let markup = r#"<script>fetch("/api/download?surl=1xyz&type=dlink")</script>"#;

    let resolution = resolver()
        .resolve("https://www.1024tera.com/sharing/link?surl=1xyz", Some(markup))
        .await
        .unwrap();

    let target = resolution.into_target().unwrap();
    assert_eq!(
        target.url,
        "https://www.1024tera.com/api/download?surl=1xyz&type=dlink"
    );
    assert_eq!(target.strategy, "api-endpoint");
}

#[tokio::test]
async fn test_protected_page_reports_every_strategy_tried() {
    let markup = r#"<html><head>
        <script src="https://cdnjs.cloudflare.com/ajax/libs/jquery.min.js"></script>
        <link rel="stylesheet" href="/static/main.css">
        </head><body><p>This link requires a password.</p></body></html>"#;

    let resolution = resolver()
        .resolve("https://www.terabox.com/s/1locked", Some(markup))
        .await
        .unwrap();

    let expected: Vec<&str> = default_strategies().iter().map(Strategy::name).collect();
    assert_eq!(
        resolution,
        Resolution::NotFound {
            strategies_tried: expected
        }
    );
}

#[test]
fn test_custom_chain_changes_priority() {
    let markup = r#"<html><body>
        <a href="https://mirror.example.net/download/a.mp4">mirror</a>
        <script>window.yunData = {"dlink": "https://d.terabox.com/file/a"};</script>
        </body></html>"#;

    let links_first = resolver().with_strategies(vec![
        Strategy::new("media-link", strategies::media_links),
        Strategy::new("embedded-state", strategies::embedded_state),
    ]);

    let resolution = links_first.resolve_markup(markup, None);
    assert_eq!(
        resolution.url(),
        Some("https://mirror.example.net/download/a.mp4")
    );
}

#[test]
fn test_custom_strategy_function() {
    fn data_attribute(ctx: &PageContext<'_>) -> Vec<String> {
        ctx.markup
            .split("data-direct=\"")
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .map(str::to_string)
            .collect()
    }

    let resolver = resolver().with_strategies(vec![Strategy::new("data-direct", data_attribute)]);
    let resolution = resolver.resolve_markup(
        r#"<div data-direct="https://d.terabox.com/file/custom.zip"></div>"#,
        None,
    );
    let target = resolution.into_target().unwrap();
    assert_eq!(target.strategy, "data-direct");
    assert_eq!(target.url, "https://d.terabox.com/file/custom.zip");
}

#[tokio::test]
async fn test_refetch_failure_is_page_unavailable() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let error = resolver()
        .resolve(&format!("{}/s/missing", mock_server.uri()), None)
        .await
        .unwrap_err();

    match error {
        ResolveError::PageUnavailable { source, .. } => {
            assert_eq!(source.status_code(), Some(404));
        }
        other => panic!("expected PageUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unparseable_page_url_is_rejected() {
    let error = resolver().resolve("terabox share", Some("<html></html>")).await;
    assert!(matches!(error, Err(ResolveError::InvalidPageUrl { .. })));
}
