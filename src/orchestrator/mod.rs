//! Request orchestration: one pipeline per submitted share link.
//!
//! [`Orchestrator::submit`] validates the link, mints a [`RequestId`], and
//! spawns a pipeline that walks `queued → resolving → locating-url →
//! downloading → completed`, or lands in `failed` from any step. Callers poll
//! [`Orchestrator::get_status`] and fetch the finished file with
//! [`Orchestrator::retrieve_file`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use sharegrab_core::{EngineConfig, Orchestrator, OrchestratorConfig, ShareEngine, StatusStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Arc::new(ShareEngine::new(EngineConfig::default())?);
//! let orchestrator = Orchestrator::new(
//!     engine,
//!     Arc::new(StatusStore::new()),
//!     OrchestratorConfig::default(),
//! );
//! let id = orchestrator.submit("https://www.terabox.com/s/1abc")?;
//! let status = orchestrator
//!     .wait_until_settled(id, Duration::from_millis(500))
//!     .await;
//! println!("{status:?}");
//! # Ok(())
//! # }
//! ```

mod error;
mod pipeline;
mod status;
mod store;

pub use error::{DiscardError, RetrieveError, SubmitError};
pub use status::{NOT_FOUND_MESSAGE, RequestId, RequestState, StatusRecord};
pub use store::StatusStore;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};
use url::Url;

use crate::config::OrchestratorConfig;
use crate::engine::ShareEngine;

use pipeline::{PipelineJob, run_guarded};

/// Content type reported for retrieved files.
pub const RETRIEVED_CONTENT_TYPE: &str = "application/octet-stream";

/// A completed file opened for streaming to a caller.
#[derive(Debug)]
pub struct RetrievedFile {
    /// Name to present to the caller.
    pub filename: String,
    /// Location on disk.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Always [`RETRIEVED_CONTENT_TYPE`].
    pub content_type: &'static str,
    /// Open read handle.
    pub file: tokio::fs::File,
}

/// Accepts share links and runs their pipelines concurrently.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    engine: Arc<ShareEngine>,
    store: Arc<StatusStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Creates an orchestrator over an engine and an injected status store.
    #[must_use]
    pub fn new(
        engine: Arc<ShareEngine>,
        store: Arc<StatusStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            engine,
            store,
            config,
        }
    }

    /// The status table this orchestrator writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Validates `source_url` and starts a pipeline for it.
    ///
    /// Returns immediately with a fresh id; the pipeline runs on its own task.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] if the URL does not parse, is not HTTP(S), or
    /// its host is not in the allowed list.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[instrument(skip(self))]
    pub fn submit(&self, source_url: &str) -> Result<RequestId, SubmitError> {
        let url = validate_source_url(source_url, &self.config.allowed_hosts)?;

        if let Some(ttl) = self.config.status_ttl {
            self.store.prune_terminal_older_than(ttl);
        }

        let mut id = RequestId::new();
        while !self.store.insert_new(id, StatusRecord::queued()) {
            id = RequestId::new();
        }

        let job = PipelineJob {
            id,
            source_url: url.to_string(),
            download_dir: self.config.download_dir.clone(),
        };
        tokio::spawn(run_guarded(
            Arc::clone(&self.engine),
            Arc::clone(&self.store),
            job,
        ));

        info!(request_id = %id, url = %url, "request submitted");
        Ok(id)
    }

    /// Current status snapshot for `id`.
    #[must_use]
    pub fn get_status(&self, id: &RequestId) -> Option<StatusRecord> {
        self.store.get(id)
    }

    /// Opens the completed file for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError::NotFound`] for unknown ids or missing files,
    /// [`RetrieveError::NotReady`] before completion, and
    /// [`RetrieveError::Io`] if the file cannot be opened.
    pub async fn retrieve_file(&self, id: &RequestId) -> Result<RetrievedFile, RetrieveError> {
        let record = self
            .store
            .get(id)
            .ok_or(RetrieveError::NotFound { id: *id })?;
        if record.state != RequestState::Completed {
            return Err(RetrieveError::NotReady {
                id: *id,
                state: record.state,
            });
        }
        let Some(path) = record.filepath else {
            return Err(RetrieveError::NotFound { id: *id });
        };

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(RetrieveError::NotFound { id: *id });
            }
            Err(source) => return Err(RetrieveError::Io { path, source }),
        };
        let size = file
            .metadata()
            .await
            .map_err(|source| RetrieveError::Io {
                path: path.clone(),
                source,
            })?
            .len();

        Ok(RetrievedFile {
            filename: record
                .filename
                .unwrap_or_else(|| file_name_of(&path)),
            path,
            size,
            content_type: RETRIEVED_CONTENT_TYPE,
            file,
        })
    }

    /// Deletes a file inside the download directory.
    ///
    /// # Errors
    ///
    /// Returns [`DiscardError::NotFound`] if nothing exists at `path`,
    /// [`DiscardError::OutsideDownloadDir`] if it resolves elsewhere, and
    /// [`DiscardError::Io`] if deletion fails.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn discard(&self, path: &Path) -> Result<(), DiscardError> {
        let not_found = || DiscardError::NotFound {
            path: path.to_path_buf(),
        };

        let target = tokio::fs::canonicalize(path)
            .await
            .map_err(|_| not_found())?;
        let root = tokio::fs::canonicalize(&self.config.download_dir)
            .await
            .map_err(|_| DiscardError::OutsideDownloadDir {
                path: path.to_path_buf(),
            })?;

        if !target.starts_with(&root) || target == root {
            return Err(DiscardError::OutsideDownloadDir {
                path: path.to_path_buf(),
            });
        }

        tokio::fs::remove_file(&target)
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => not_found(),
                _ => DiscardError::Io {
                    path: path.to_path_buf(),
                    source,
                },
            })?;
        debug!("discarded file");
        Ok(())
    }

    /// Polls until `id` reaches a terminal state. Returns `None` for unknown ids.
    pub async fn wait_until_settled(
        &self,
        id: RequestId,
        poll_interval: Duration,
    ) -> Option<StatusRecord> {
        loop {
            let record = self.store.get(&id)?;
            if record.state.is_terminal() {
                return Some(record);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Checks that `source` is an HTTP(S) URL on an accepted host.
///
/// Subdomains of an allowed host are accepted. An empty list accepts any host.
///
/// # Errors
///
/// Returns the matching [`SubmitError`] variant.
pub fn validate_source_url(source: &str, allowed_hosts: &[String]) -> Result<Url, SubmitError> {
    let trimmed = source.trim();
    let url = Url::parse(trimmed).map_err(|_| SubmitError::InvalidUrl {
        url: trimmed.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(SubmitError::UnsupportedScheme {
            url: trimmed.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    let host = url
        .host_str()
        .ok_or_else(|| SubmitError::InvalidUrl {
            url: trimmed.to_string(),
        })?
        .trim_end_matches('.')
        .to_ascii_lowercase();

    if allowed_hosts.is_empty() {
        return Ok(url);
    }

    let allowed = allowed_hosts.iter().any(|candidate| {
        let candidate = candidate.trim().trim_end_matches('.').to_ascii_lowercase();
        !candidate.is_empty()
            && (host == candidate || host.ends_with(&format!(".{candidate}")))
    });
    if allowed {
        Ok(url)
    } else {
        Err(SubmitError::host_not_allowed(&host))
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download.bin".to_string())
}
