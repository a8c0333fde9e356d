//! Runtime configuration for the engine and orchestrator.
//!
//! Both structs carry defaults matching the behavior of an interactive
//! session; tests typically start from `Default` and switch pacing off.

use std::path::PathBuf;
use std::time::Duration;

/// Default connect timeout for every request.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default total timeout for share-page fetches.
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default total timeout for file transfers.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Default number of attempts (initial + retries) for connection failures.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for retry backoff.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// HTML responses smaller than this are treated as error pages during transfer.
pub const DEFAULT_HTML_ERROR_THRESHOLD: u64 = 4096;

/// Hosts of the TeraBox share-link family accepted by default.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "terabox.com",
    "terabox.app",
    "teraboxapp.com",
    "1024terabox.com",
    "1024tera.com",
    "freeterabox.com",
    "teraboxlink.com",
    "terasharelink.com",
    "4funbox.com",
    "mirrobox.com",
    "nephobox.com",
    "momerybox.com",
    "tibibox.com",
];

/// Request pacing behavior applied before page fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacingConfig {
    /// No delay and a fixed browser identity. Deterministic; used by tests.
    Disabled,
    /// Random delay in `[min_delay, max_delay]` before each page fetch, with
    /// optional identity rotation between attempts.
    Randomized {
        /// Lower delay bound.
        min_delay: Duration,
        /// Upper delay bound.
        max_delay: Duration,
        /// Whether each attempt picks a different browser identity.
        rotate_identity: bool,
    },
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::Randomized {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
            rotate_identity: true,
        }
    }
}

/// Configuration for [`ShareEngine`](crate::ShareEngine) and its components.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Validate server certificates. When `false`, invalid or self-signed
    /// certificates are accepted.
    pub verify_tls: bool,
    /// Connect timeout for every request.
    pub connect_timeout: Duration,
    /// Total timeout for share-page fetches.
    pub page_timeout: Duration,
    /// Total timeout for file transfers.
    pub transfer_timeout: Duration,
    /// Attempts (initial + retries) for connection-level failures.
    pub max_attempts: u32,
    /// Base delay for exponential retry backoff.
    pub retry_base_delay: Duration,
    /// Pacing / identity rotation policy.
    pub pacing: PacingConfig,
    /// Hosting-site names used as inclusion keywords and title suffix markers.
    pub site_keywords: Vec<String>,
    /// Size below which an HTML transfer response is treated as an error page.
    pub html_error_threshold: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verify_tls: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            pacing: PacingConfig::default(),
            site_keywords: vec!["terabox".to_string()],
            html_error_threshold: DEFAULT_HTML_ERROR_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Returns a config with pacing disabled and short retry delays.
    #[must_use]
    pub fn deterministic() -> Self {
        Self {
            pacing: PacingConfig::Disabled,
            retry_base_delay: Duration::from_millis(10),
            ..Self::default()
        }
    }
}

/// Configuration for the [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory completed files are written to.
    pub download_dir: PathBuf,
    /// Accepted share-page hosts (subdomains included). Empty accepts any host.
    pub allowed_hosts: Vec<String>,
    /// When set, terminal status records older than this are pruned on submit.
    pub status_ttl: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            allowed_hosts: DEFAULT_ALLOWED_HOSTS
                .iter()
                .map(|host| (*host).to_string())
                .collect(),
            status_ttl: None,
        }
    }
}
