//! File transfer engine for resolved download URLs.
//!
//! # Features
//!
//! - Streaming writes through a buffered file handle
//! - Referer, `Range: bytes=0-` and `Accept: */*` headers on every transfer
//! - HTML error-page detection before any file is created
//! - Partial and zero-byte files removed on failure
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use sharegrab_core::EngineConfig;
//! use sharegrab_core::download::{TransferEngine, TransferOptions};
//! use sharegrab_core::http::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let engine = TransferEngine::new(HttpClient::new(&config)?, config.html_error_threshold);
//! let result = engine
//!     .transfer(
//!         "https://d.example.com/file/abc",
//!         "video.mp4",
//!         Path::new("./downloads"),
//!         &TransferOptions::default(),
//!     )
//!     .await;
//! println!("success: {}", result.success);
//! # Ok(())
//! # }
//! ```

mod constants;
mod error;
mod transfer;

pub use constants::{ERROR_EXCERPT_CHARS, FULL_BODY_RANGE};
pub use error::TransferError;
pub use transfer::{
    ProgressSink, TransferEngine, TransferOptions, TransferProgress, TransferReceipt,
    TransferResult,
};
