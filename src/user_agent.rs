//! Browser identity profiles used for every outgoing request.
//!
//! Share hosts serve a different (or empty) page to clients that do not look
//! like a browser, so requests carry a complete browser header set. A profile
//! bundles the headers that must stay mutually consistent.

use rand::Rng;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, DNT, HeaderMap, HeaderName, HeaderValue,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

/// A consistent set of browser identification values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserIdentity {
    /// `User-Agent` header value.
    pub user_agent: &'static str,
    /// `Accept-Language` header value.
    pub accept_language: &'static str,
}

/// Identity used when rotation is disabled.
pub const DEFAULT_IDENTITY: BrowserIdentity = BrowserIdentity {
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    accept_language: "en-US,en;q=0.5",
};

/// Pool of desktop identities used for rotation between attempts.
pub const IDENTITY_POOL: &[BrowserIdentity] = &[
    DEFAULT_IDENTITY,
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
            (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        accept_language: "en-US,en;q=0.9",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
        accept_language: "en-US,en;q=0.5",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 \
            (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
        accept_language: "en-GB,en;q=0.9",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
            (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        accept_language: "en-US,en;q=0.8",
    },
];

const ACCEPT_DOCUMENT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Picks a random identity from [`IDENTITY_POOL`].
#[must_use]
pub fn random_identity() -> BrowserIdentity {
    let mut rng = rand::thread_rng();
    IDENTITY_POOL[rng.gen_range(0..IDENTITY_POOL.len())]
}

/// Picks a random identity that differs from `previous` when the pool allows it.
#[must_use]
pub fn rotate_identity(previous: &BrowserIdentity) -> BrowserIdentity {
    let mut rng = rand::thread_rng();
    let candidates: Vec<&BrowserIdentity> = IDENTITY_POOL
        .iter()
        .filter(|identity| identity.user_agent != previous.user_agent)
        .collect();
    if candidates.is_empty() {
        return *previous;
    }
    *candidates[rng.gen_range(0..candidates.len())]
}

impl BrowserIdentity {
    /// Builds the full navigation header set for this identity.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(self.user_agent));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_DOCUMENT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(self.accept_language),
        );
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        headers.insert(DNT, HeaderValue::from_static("1"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("document"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("navigate"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static("none"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-user"),
            HeaderValue::from_static("?1"),
        );
        headers
    }
}
