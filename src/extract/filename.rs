//! File name extraction from share-page markup.
//!
//! [`extract_filename`] is total: it always returns a non-empty name that is
//! safe as a single path segment and ends in a dot-extension.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::resolver::utils::compile_static_regex;

/// Prefix for synthesized names when the page carries no usable name.
const FALLBACK_PREFIX: &str = "sharegrab_file";

/// Maximum name length in characters (extension included).
const MAX_FILENAME_CHARS: usize = 200;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<title[^>]*>(.*?)</title>"));

static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<meta\s+[^>]*property\s*=\s*["']og:title["'][^>]*content\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
    )
});

static OG_TITLE_CONTENT_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<meta\s+[^>]*content\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*property\s*=\s*["']og:title["']"#,
    )
});

static JSON_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#""(?:server_filename|filename)"\s*:\s*"((?:[^"\\]|\\.)*)""#)
});

static JS_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?i)\b(?:file_name|download_filename)["']?\s*[:=]\s*(?:"([^"]+)"|'([^']+)')"#,
    )
});

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\.[A-Za-z0-9]{1,4}$"));

static VIDEO_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)\b(?:video|mp4|mkv|avi|mov|webm|m3u8)\b"));

static IMAGE_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)\b(?:image|photo|jpe?g|png|gif|webp)\b"));

static DOCUMENT_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)\b(?:pdf|document|docx?)\b"));

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"&#(x[0-9a-fA-F]+|[0-9]+);"));

/// Where a file name candidate may appear, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameSource {
    Title,
    SocialTitle,
    JsonField,
    ScriptField,
}

/// Extracts file names from markup, stripping hosting-site branding from titles.
#[derive(Debug, Clone)]
pub struct FilenameExtractor {
    site_keywords: Vec<String>,
}

impl Default for FilenameExtractor {
    fn default() -> Self {
        Self::new(vec!["terabox".to_string()])
    }
}

impl FilenameExtractor {
    /// Creates an extractor that treats title segments mentioning any of
    /// `site_keywords` as branding.
    #[must_use]
    pub fn new(site_keywords: Vec<String>) -> Self {
        Self {
            site_keywords: site_keywords
                .into_iter()
                .map(|keyword| keyword.to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        }
    }

    /// Derives a safe, extension-bearing file name from `markup`. Never fails.
    #[must_use]
    pub fn extract(&self, markup: &str) -> String {
        let extension = infer_extension(markup);

        let Some((source, raw)) = first_candidate(markup) else {
            debug!("no filename signal in markup, synthesizing name");
            return fallback_name(extension);
        };

        let mut name = decode_html_entities(&raw);
        if matches!(source, NameSource::Title | NameSource::SocialTitle) {
            name = self.strip_site_suffix(&name);
        }
        let decoded = urlencoding::decode(&name)
            .map(std::borrow::Cow::into_owned)
            .unwrap_or(name);
        let mut cleaned = sanitize_filename(&decoded)
            .trim_matches(|c: char| c == '.' || c.is_whitespace())
            .to_string();

        if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
            debug!(?source, "filename candidate empty after sanitizing");
            return fallback_name(extension);
        }

        if !has_extension(&cleaned) {
            cleaned.push('.');
            cleaned.push_str(extension);
        }

        let name = truncate_preserving_extension(&cleaned, MAX_FILENAME_CHARS);
        debug!(?source, filename = %name, "extracted filename");
        name
    }

    fn strip_site_suffix(&self, title: &str) -> String {
        for separator in [" - ", " | ", " – "] {
            if let Some((head, tail)) = title.rsplit_once(separator) {
                let tail = tail.to_lowercase();
                if !head.trim().is_empty()
                    && self
                        .site_keywords
                        .iter()
                        .any(|keyword| tail.contains(keyword.as_str()))
                {
                    return head.trim().to_string();
                }
            }
        }
        title.to_string()
    }
}

/// Extracts a file name using the default site keywords.
#[must_use]
pub fn extract_filename(markup: &str) -> String {
    FilenameExtractor::default().extract(markup)
}

/// Replaces filesystem-reserved and control characters with `_`.
///
/// Reserved: `< > : " / \ | ? *`. Names that would resolve to the current or
/// parent directory are replaced as well.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return "_".to_string();
    }
    sanitized
}

fn first_candidate(markup: &str) -> Option<(NameSource, String)> {
    let patterns: [(NameSource, &Regex); 5] = [
        (NameSource::Title, &TITLE_RE),
        (NameSource::SocialTitle, &OG_TITLE_RE),
        (NameSource::SocialTitle, &OG_TITLE_CONTENT_FIRST_RE),
        (NameSource::JsonField, &JSON_FILENAME_RE),
        (NameSource::ScriptField, &JS_FILENAME_RE),
    ];

    patterns.iter().find_map(|(source, regex)| {
        regex.captures_iter(markup).find_map(|caps| {
            let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
            let value = if *source == NameSource::JsonField {
                unescape_json_string(raw)
            } else {
                raw.to_string()
            };
            let value = value.trim();
            (value.chars().count() > 1).then(|| (*source, value.to_string()))
        })
    })
}

fn unescape_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.replace("\\/", "/"))
}

fn has_extension(name: &str) -> bool {
    EXTENSION_RE.is_match(name)
}

/// Picks an extension from keywords in the page text.
fn infer_extension(markup: &str) -> &'static str {
    if VIDEO_HINT_RE.is_match(markup) {
        "mp4"
    } else if IMAGE_HINT_RE.is_match(markup) {
        "jpg"
    } else if DOCUMENT_HINT_RE.is_match(markup) {
        "pdf"
    } else {
        "bin"
    }
}

fn fallback_name(extension: &str) -> String {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{FALLBACK_PREFIX}_{timestamp}.{extension}")
}

fn truncate_preserving_extension(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let (stem, extension) = match name.rfind('.') {
        Some(index) if index > 0 => (&name[..index], &name[index..]),
        _ => (name, ""),
    };
    let keep = max_chars.saturating_sub(extension.chars().count());
    let stem: String = stem.chars().take(keep).collect();
    format!("{}{extension}", stem.trim_end())
}

fn decode_html_entities(value: &str) -> String {
    let named = value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ");
    let numeric = NUMERIC_ENTITY_RE.replace_all(&named, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });
    // &amp; last so "&amp;lt;" stays "&lt;"
    numeric.replace("&amp;", "&")
}
