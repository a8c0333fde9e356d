//! Shared helpers for resolver strategies: static regex compilation, URL joining, and unescaping.

use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> regex::Regex {
    regex::Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Resolves a possibly relative URL string against a base URL.
///
/// Returns the value as-is if it already starts with `http://` or `https://`;
/// normalizes `//...` to the base scheme; otherwise joins with `base_url`.
#[must_use]
pub fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("{}:{value}", base_url.scheme()));
    }
    base_url.join(value).ok().map(|url| url.to_string())
}

/// Returns `scheme://host[:port]` for `url`, or `None` for opaque URLs.
#[must_use]
pub fn origin(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}

/// Undoes the escaping commonly found on URLs embedded in inline scripts:
/// `\/`, `&` and `&amp;`.
#[must_use]
pub fn unescape_embedded_url(raw: &str) -> String {
    raw.trim()
        .replace("\\/", "/")
        .replace("\\u0026", "&")
        .replace("\\u002F", "/")
        .replace("&amp;", "&")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_absolutize_url_absolute_unchanged() {
        let base = Url::parse("https://www.terabox.com/s/1abc").unwrap();
        assert_eq!(
            absolutize_url("http://cdn.example/x.mp4", &base).as_deref(),
            Some("http://cdn.example/x.mp4")
        );
    }

    #[test]
    fn test_absolutize_url_protocol_relative_uses_base_scheme() {
        let base = Url::parse("http://share.local/s/1").unwrap();
        assert_eq!(
            absolutize_url("//cdn.example/x.mp4", &base).as_deref(),
            Some("http://cdn.example/x.mp4")
        );
    }

    #[test]
    fn test_absolutize_url_relative_joined_with_base() {
        let base = Url::parse("https://www.terabox.com/s/1abc").unwrap();
        assert_eq!(
            absolutize_url("/api/download?id=7", &base).as_deref(),
            Some("https://www.terabox.com/api/download?id=7")
        );
        assert_eq!(
            absolutize_url("file/x.mkv", &base).as_deref(),
            Some("https://www.terabox.com/s/file/x.mkv")
        );
    }

    #[test]
    fn test_origin_includes_port_when_explicit() {
        let url = Url::parse("http://127.0.0.1:8080/s/abc?x=1").unwrap();
        assert_eq!(origin(&url).as_deref(), Some("http://127.0.0.1:8080"));
        let url = Url::parse("https://www.terabox.com/s/abc").unwrap();
        assert_eq!(origin(&url).as_deref(), Some("https://www.terabox.com"));
    }

    #[test]
    fn test_unescape_embedded_url() {
        assert_eq!(
            unescape_embedded_url(r"https:\/\/d.example\/file?a=1&b=2"),
            "https://d.example/file?a=1&b=2"
        );
        assert_eq!(unescape_embedded_url(" http://x/?a=1&amp;b=2 "), "http://x/?a=1&b=2");
    }
}
