//! Download-URL resolution over share-page markup.
//!
//! The resolver runs a priority-ordered chain of independent, pure extraction
//! strategies and returns the first candidate that passes [`UrlFilter`].
//!
//! # Architecture
//!
//! - [`Resolver`] - owns the chain, the filter, and the client used to re-fetch pages
//! - [`Strategy`] - a named `fn(&PageContext) -> Vec<String>`
//! - [`default_strategies`] - embedded state, linked data, script variables,
//!   media links, API endpoints (in that order)
//! - [`UrlFilter`] - exclusion/inclusion predicate applied to every candidate
//! - [`normalize_near_json`] - repair pass for script-embedded object literals
//!
//! # Example
//!
//! ```no_run
//! use sharegrab_core::EngineConfig;
//! use sharegrab_core::http::HttpClient;
//! use sharegrab_core::resolver::{Resolver, UrlFilter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let resolver = Resolver::new(HttpClient::new(&config)?, UrlFilter::new(&config.site_keywords));
//! let resolution = resolver
//!     .resolve("https://www.terabox.com/s/1abc", None)
//!     .await?;
//! println!("{:?}", resolution.url());
//! # Ok(())
//! # }
//! ```

mod chain;
mod error;
mod json_repair;
pub mod strategies;
pub(crate) mod utils;
mod validate;

pub use chain::{DownloadTarget, ExtractFn, PageContext, Resolution, Resolver, Strategy};
pub use error::ResolveError;
pub use json_repair::{balanced_object, normalize_near_json};
pub use strategies::default_strategies;
pub use validate::{MIN_UNSIGNALED_LENGTH, Rejection, UrlFilter};
