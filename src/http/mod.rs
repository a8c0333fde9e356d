//! HTTP client wrapper shared by page fetching and file transfer.
//!
//! Every request carries a browser-like header set, uses a configurable
//! certificate policy, and is retried a bounded number of times on
//! connection-level failures. Pacing (randomized pre-request delay and
//! identity rotation) is an injectable [`PacingPolicy`].
//!
//! # Example
//!
//! ```no_run
//! use sharegrab_core::EngineConfig;
//! use sharegrab_core::http::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(&EngineConfig::default())?;
//! let page = client.fetch_page("https://www.terabox.com/s/1abcdef").await?;
//! println!("{} ({} bytes)", page.final_url, page.raw_markup.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod pacing;
mod retry;

pub use client::{FetchOptions, HttpClient, PageSnapshot};
pub use error::HttpError;
pub use pacing::{NoPacing, PacingPolicy, RandomizedPacing, RequestKind, pacing_from_config};
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
