//! Sharegrab Core Library
//!
//! Resolves file-hosting share pages to direct download URLs and streams the
//! referenced files to disk, reporting progress through a polled status table.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`http`] - Browser-like HTTP client with bounded retry and injectable pacing
//! - [`extract`] - File name extraction from share-page markup
//! - [`resolver`] - Priority-ordered download-URL strategy chain and URL filter
//! - [`download`] - Streamed file transfer with error-page detection
//! - [`engine`] - The three engine operations over one client
//! - [`orchestrator`] - Per-request pipelines and the status state machine
//! - [`config`] - Engine and orchestrator configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod engine;
pub mod extract;
pub mod http;
pub mod orchestrator;
pub mod resolver;
#[cfg(test)]
pub mod test_support;
pub mod user_agent;

// Re-export commonly used types
pub use config::{EngineConfig, OrchestratorConfig, PacingConfig};
pub use download::{TransferEngine, TransferError, TransferOptions, TransferProgress, TransferResult};
pub use engine::{FileInfo, ShareEngine};
pub use extract::{extract_filename, sanitize_filename};
pub use http::{HttpClient, HttpError, PageSnapshot};
pub use orchestrator::{
    DiscardError, Orchestrator, RequestId, RequestState, RetrieveError, RetrievedFile,
    StatusRecord, StatusStore, SubmitError, validate_source_url,
};
pub use resolver::{DownloadTarget, Resolution, ResolveError, Resolver, UrlFilter};
