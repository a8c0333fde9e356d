//! The built-in extraction strategies, most structured signal first.
//!
//! Each strategy is a pure function from page context to candidate URLs in
//! discovery order. Candidates are not validated here.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::chain::{PageContext, Strategy};
use super::json_repair::{balanced_object, normalize_near_json};
use super::utils::{compile_static_regex, origin, unescape_embedded_url};

/// Keys whose `http…` string values are download URL candidates in embedded state.
const STATE_URL_KEYS: [&str; 6] = [
    "dlink",
    "downloadUrl",
    "url",
    "fileUrl",
    "videoUrl",
    "contentUrl",
];

/// Path suffixes that mark a link as direct media.
const MEDIA_SUFFIXES: [&str; 4] = [".mp4", ".mkv", ".avi", ".mov"];

static STATE_ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r"(?:\bwindow\.[A-Za-z_$][\w$]*|\b(?:var|let|const)\s+[A-Za-z_$][\w$]*)\s*=\s*\{",
    )
});

static DLINK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#""dlink"\s*:\s*"((?:[^"\\]|\\.)*)""#));

static LD_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#,
    )
});

static SCRIPT_VARIABLE_RES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        compile_static_regex(
            r#"\b(?:fileUrl|downloadUrl|videoUrl)["']?\s*[:=]\s*["']([^"']+)["']"#,
        ),
        compile_static_regex(r#"\b(?:src|url)["']?\s*:\s*["']([^"']+)["']"#),
        compile_static_regex(r#"window\.location\.href\s*=\s*["']([^"']+)["']"#),
        compile_static_regex(r#"window\.open\(\s*["']([^"']+)["']"#),
    ]
});

static LINK_ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?i)(?:\s|^)(?:href|src|data-src|data-url)\s*=\s*["']([^"']+)["']"#)
});

static VIDEO_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<video\b[^>]*>(.*?)</video>"));

static SOURCE_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<source\b[^>]*\ssrc\s*=\s*["']([^"']+)["']"#)
});

static API_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"["'](/(?:api|download|file|v1|v2)/[^"'\s<>]*)["']"#)
});

/// Returns the built-in chain in priority order.
#[must_use]
pub fn default_strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("embedded-state", embedded_state),
        Strategy::new("linked-data", linked_data),
        Strategy::new("script-variable", script_variables),
        Strategy::new("media-link", media_links),
        Strategy::new("api-endpoint", api_endpoints),
    ]
}

/// Script-assigned object literals (`window.x = {...}`, `var x = {...}`).
///
/// Each literal is repaired and parsed; known URL keys are collected
/// depth-first. A literal that still fails to parse falls back to a raw
/// `"dlink"` capture.
pub fn embedded_state(ctx: &PageContext<'_>) -> Vec<String> {
    let mut candidates = Vec::new();

    for assignment in STATE_ASSIGNMENT_RE.find_iter(ctx.markup) {
        let brace = assignment.end() - 1;
        let Some(fragment) = balanced_object(ctx.markup, brace) else {
            continue;
        };

        match serde_json::from_str::<Value>(&normalize_near_json(fragment)) {
            Ok(value) => collect_state_urls(&value, &mut candidates),
            Err(error) => {
                tracing::trace!(%error, "state object not parseable, scanning for dlink");
                candidates.extend(
                    DLINK_RE
                        .captures_iter(fragment)
                        .filter_map(|caps| caps.get(1))
                        .map(|m| unescape_embedded_url(m.as_str())),
                );
            }
        }
    }
    candidates
}

fn collect_state_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match child {
                    Value::String(text)
                        if STATE_URL_KEYS.contains(&key.as_str()) && text.starts_with("http") =>
                    {
                        out.push(text.clone());
                    }
                    Value::Object(_) | Value::Array(_) => collect_state_urls(child, out),
                    _ => {}
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_state_urls(item, out);
            }
        }
        _ => {}
    }
}

/// `<script type="application/ld+json">` blocks: `contentUrl`, then `url`.
pub fn linked_data(ctx: &PageContext<'_>) -> Vec<String> {
    let mut candidates = Vec::new();

    for caps in LD_JSON_RE.captures_iter(ctx.markup) {
        let Some(body) = caps.get(1) else { continue };
        let Ok(value) = serde_json::from_str::<Value>(body.as_str().trim()) else {
            continue;
        };
        for key in ["contentUrl", "url"] {
            let mut found = Vec::new();
            collect_key(&value, key, &mut found);
            candidates.extend(found.into_iter().filter_map(|url| ctx.absolutize(&url)));
        }
    }
    candidates
}

fn collect_key(value: &Value, key: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get(key) {
                if !text.trim().is_empty() {
                    out.push(text.trim().to_string());
                }
            }
            for child in map.values() {
                collect_key(child, key, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_key(item, key, out);
            }
        }
        _ => {}
    }
}

/// Inline script assignments, object fields and navigation redirects.
pub fn script_variables(ctx: &PageContext<'_>) -> Vec<String> {
    SCRIPT_VARIABLE_RES
        .iter()
        .flat_map(|regex| {
            regex
                .captures_iter(ctx.markup)
                .filter_map(|caps| caps.get(1))
                .map(|m| unescape_embedded_url(m.as_str()))
        })
        .collect()
}

/// Link attributes pointing at media files or download paths, then
/// `<video><source src>` tags.
pub fn media_links(ctx: &PageContext<'_>) -> Vec<String> {
    let attributes = LINK_ATTRIBUTE_RE
        .captures_iter(ctx.markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_embedded_url(m.as_str()))
        .filter(|value| looks_like_file_link(value));

    let video_sources = VIDEO_BLOCK_RE
        .captures_iter(ctx.markup)
        .filter_map(|caps| caps.get(1))
        .flat_map(|block| {
            SOURCE_SRC_RE
                .captures_iter(block.as_str())
                .filter_map(|caps| caps.get(1))
                .map(|m| unescape_embedded_url(m.as_str()))
                .collect::<Vec<_>>()
        });

    attributes
        .chain(video_sources)
        .filter_map(|value| ctx.absolutize(&value))
        .collect()
}

fn looks_like_file_link(value: &str) -> bool {
    let lower = value.to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    MEDIA_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
        || path.contains("download")
        || path.contains("file")
}

/// Relative API-looking string literals joined to the page origin.
pub fn api_endpoints(ctx: &PageContext<'_>) -> Vec<String> {
    let Some(origin) = ctx.page_url.and_then(origin) else {
        return Vec::new();
    };
    API_PATH_RE
        .captures_iter(ctx.markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| format!("{origin}{}", unescape_embedded_url(m.as_str())))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;

    fn ctx(markup: &str) -> PageContext<'_> {
        PageContext::new(markup, None)
    }

    #[test]
    fn test_embedded_state_finds_dlink() {
        let markup = r#"<script>window.yunData = {"dlink":"http://cdn.example/x"};</script>"#;
        assert_eq!(embedded_state(&ctx(markup)), vec!["http://cdn.example/x"]);
    }

    #[test]
    fn test_embedded_state_nested_list_and_repair() {
        let markup = r#"<script>
            var locals = {
                "share": {"title": "x", "list": [
                    {"server_filename": "a.mp4", "dlink": "https:\/\/d.terabox.com\/file\/abc?fid=1",},
                ]},
            };
        </script>"#;
        assert_eq!(
            embedded_state(&ctx(markup)),
            vec!["https://d.terabox.com/file/abc?fid=1"]
        );
    }

    #[test]
    fn test_embedded_state_depth_first_document_order() {
        let markup = r#"window.s = {"a": {"url": "https://first.example/1"}, "dlink": "https://second.example/2"};"#;
        assert_eq!(
            embedded_state(&ctx(markup)),
            vec!["https://first.example/1", "https://second.example/2"]
        );
    }

    #[test]
    fn test_embedded_state_ignores_non_http_values() {
        let markup = r#"const cfg = {"url": "/relative", "fileUrl": 42};"#;
        assert!(embedded_state(&ctx(markup)).is_empty());
    }

    #[test]
    fn test_embedded_state_unparseable_falls_back_to_dlink_regex() {
        let markup = r#"window.data = {dlink: 1, "dlink":"https:\/\/d.example\/f", bad: undefined};"#;
        assert_eq!(embedded_state(&ctx(markup)), vec!["https://d.example/f"]);
    }

    #[test]
    fn test_linked_data_prefers_content_url() {
        let markup = r#"<script type="application/ld+json">
            {"@type": "VideoObject", "url": "https://page.example/v", "contentUrl": "https://media.example/v.mp4"}
        </script>"#;
        assert_eq!(
            linked_data(&ctx(markup)),
            vec!["https://media.example/v.mp4", "https://page.example/v"]
        );
    }

    #[test]
    fn test_linked_data_skips_invalid_json() {
        let markup = r#"<script type="application/ld+json">{not json}</script>"#;
        assert!(linked_data(&ctx(markup)).is_empty());
    }

    #[test]
    fn test_script_variables_patterns() {
        let markup = r#"
            var downloadUrl = "https:\/\/dl.example\/a.zip";
            player.setup({src: 'https://stream.example/b.m3u8'});
            window.location.href = "https://go.example/c";
            window.open('https://open.example/d');
        "#;
        assert_eq!(
            script_variables(&ctx(markup)),
            vec![
                "https://dl.example/a.zip",
                "https://stream.example/b.m3u8",
                "https://go.example/c",
                "https://open.example/d",
            ]
        );
    }

    #[test]
    fn test_media_links_absolutized_and_filtered() {
        let base = Url::parse("https://share.example/s/1").unwrap();
        let markup = r#"
            <a href="/static/app.css">css</a>
            <a href="/media/clip.MP4?sig=1">clip</a>
            <a data-url="https://files.example/download/7">dl</a>
            <img src="/logo.png">
            <video controls><source src="/stream/master" type="video/mp4"></video>
        "#;
        let found = media_links(&PageContext::new(markup, Some(&base)));
        assert_eq!(
            found,
            vec![
                "https://share.example/media/clip.MP4?sig=1",
                "https://files.example/download/7",
                "https://share.example/stream/master",
            ]
        );
    }

    #[test]
    fn test_api_endpoints_need_page_url() {
        let markup = r#"fetch("/api/download?surl=abc"); var v = '/v2/file/list';"#;
        assert!(api_endpoints(&ctx(markup)).is_empty());

        let base = Url::parse("http://127.0.0.1:9000/s/abc").unwrap();
        assert_eq!(
            api_endpoints(&PageContext::new(markup, Some(&base))),
            vec![
                "http://127.0.0.1:9000/api/download?surl=abc",
                "http://127.0.0.1:9000/v2/file/list",
            ]
        );
    }

    #[test]
    fn test_default_strategy_order() {
        let names: Vec<&str> = default_strategies().iter().map(Strategy::name).collect();
        assert_eq!(
            names,
            vec![
                "embedded-state",
                "linked-data",
                "script-variable",
                "media-link",
                "api-endpoint"
            ]
        );
    }
}
