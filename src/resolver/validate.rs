//! Candidate URL filter applied to every strategy output.

use std::fmt;

use url::Url;

/// Path extensions of static page assets that are never the shared file.
const EXCLUDED_EXTENSIONS: [&str; 14] = [
    "js", "css", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff", "woff2", "ttf", "eot",
    "map",
];

/// Host fragments of analytics, ad, tracker and script-CDN services.
const EXCLUDED_HOST_MARKERS: [&str; 16] = [
    "google-analytics.",
    "googletagmanager.",
    "googlesyndication.",
    "doubleclick.",
    "facebook.net",
    "connect.facebook",
    "hotjar.",
    "adservice.",
    "analytics.",
    "tracker.",
    "cdnjs.cloudflare.com",
    "jsdelivr.net",
    "unpkg.com",
    "code.jquery.com",
    "fonts.googleapis.com",
    "fonts.gstatic.com",
];

/// Host prefixes for ad/tracking subdomains.
const EXCLUDED_HOST_PREFIXES: [&str; 4] = ["ads.", "ad.", "track.", "pixel."];

/// Substrings that mark a URL as likely file content.
const INCLUDE_KEYWORDS: [&str; 6] = ["download", "file", "video", "stream", "cdn", "dlink"];

/// Media and document extensions that mark a URL as likely file content.
const INCLUDE_EXTENSIONS: [&str; 14] = [
    ".mp4", ".mkv", ".avi", ".mov", ".webm", ".m3u8", ".mp3", ".flac", ".pdf", ".zip", ".rar",
    ".7z", ".apk", ".iso",
];

/// Candidates longer than this are accepted without an include signal.
pub const MIN_UNSIGNALED_LENGTH: usize = 20;

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not an absolute `http(s)` URL.
    NotHttp,
    /// Host matched an analytics/ad/tracker marker.
    ExcludedHost(String),
    /// Path ends in a static asset extension.
    StaticAsset(String),
    /// Short and carries no file signal.
    NoSignal,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotHttp => write!(f, "not an absolute http(s) URL"),
            Self::ExcludedHost(host) => write!(f, "excluded host {host}"),
            Self::StaticAsset(ext) => write!(f, "static asset extension .{ext}"),
            Self::NoSignal => write!(f, "no file signal and too short"),
        }
    }
}

/// Pure exclusion/inclusion predicate over candidate URLs.
///
/// A candidate passes when it is an absolute `http(s)` URL, matches no
/// exclusion marker, and either carries an include signal or is longer than
/// [`MIN_UNSIGNALED_LENGTH`] characters.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    site_keywords: Vec<String>,
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self::new(&["terabox".to_string()])
    }
}

impl UrlFilter {
    /// Creates a filter that also treats `site_keywords` as include signals.
    #[must_use]
    pub fn new(site_keywords: &[String]) -> Self {
        Self {
            site_keywords: site_keywords
                .iter()
                .map(|keyword| keyword.trim().to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        }
    }

    /// Returns true if `candidate` is acceptable as a download URL.
    #[must_use]
    pub fn validate(&self, candidate: &str) -> bool {
        self.check(candidate).is_ok()
    }

    /// Like [`validate`](Self::validate) but reports the rejection reason.
    ///
    /// # Errors
    ///
    /// Returns the first [`Rejection`] that applies.
    pub fn check(&self, candidate: &str) -> Result<(), Rejection> {
        let lower = candidate.trim().to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(Rejection::NotHttp);
        }
        let parsed = Url::parse(&lower).map_err(|_| Rejection::NotHttp)?;
        let host = parsed.host_str().ok_or(Rejection::NotHttp)?;

        if EXCLUDED_HOST_PREFIXES
            .iter()
            .any(|prefix| host.starts_with(prefix))
            || EXCLUDED_HOST_MARKERS
                .iter()
                .any(|marker| host.contains(marker))
        {
            return Err(Rejection::ExcludedHost(host.to_string()));
        }

        if let Some(ext) = path_extension(parsed.path()).filter(|ext| EXCLUDED_EXTENSIONS.contains(ext)) {
            return Err(Rejection::StaticAsset(ext.to_string()));
        }

        let signaled = INCLUDE_KEYWORDS.iter().any(|kw| lower.contains(kw))
            || INCLUDE_EXTENSIONS.iter().any(|ext| lower.contains(ext))
            || self
                .site_keywords
                .iter()
                .any(|kw| lower.contains(kw.as_str()));

        if signaled || candidate.trim().chars().count() > MIN_UNSIGNALED_LENGTH {
            Ok(())
        } else {
            Err(Rejection::NoSignal)
        }
    }
}

fn path_extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}
