//! Streamed transfer of a resolved file to disk.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_RANGE, CONTENT_TYPE, HeaderValue, RANGE, REFERER};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use crate::extract::sanitize_filename;
use crate::http::{FetchOptions, HttpClient, HttpError};
use crate::resolver::utils::origin;

use super::TransferError;
use super::constants::{ERROR_EXCERPT_CHARS, FULL_BODY_RANGE, PROGRESS_LOG_INTERVAL_BYTES};

/// Cumulative progress reported after each written chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes written so far.
    pub bytes_written: u64,
    /// Declared body size, when the server sent one.
    pub total_bytes: Option<u64>,
}

impl TransferProgress {
    /// Completed fraction in `[0, 1]`, when the total is known and non-zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.bytes_written as f64 / total as f64).min(1.0))
            }
            _ => None,
        }
    }
}

/// Callback receiving progress updates.
pub type ProgressSink = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Per-transfer options.
#[derive(Clone, Default)]
pub struct TransferOptions {
    /// Referer to send; defaults to the download URL's origin.
    pub referer: Option<String>,
    /// Progress callback.
    pub progress: Option<ProgressSink>,
}

impl TransferOptions {
    /// Sets the referer (usually the share page URL).
    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Sets the progress callback.
    #[must_use]
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("referer", &self.referer)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Flat outcome of a transfer, one per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Whether a non-empty file was written.
    pub success: bool,
    /// Destination path (absent from disk on failure).
    pub filepath: PathBuf,
    /// Bytes written on success, 0 on failure.
    pub bytes_written: u64,
    /// Failure description.
    pub error: Option<String>,
}

/// Details of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Written file.
    pub path: PathBuf,
    /// File size in bytes.
    pub bytes_written: u64,
    /// Declared body size, if any.
    pub total_bytes: Option<u64>,
    /// Response content type, if any.
    pub content_type: Option<String>,
}

/// Streams resolved download URLs to disk.
///
/// Responses that look like HTML error pages are rejected before a file is
/// created. Any failure after creation removes the file, so a failed transfer
/// never leaves a partial or zero-byte file behind.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    client: HttpClient,
    html_error_threshold: u64,
}

impl TransferEngine {
    /// Creates an engine over `client`.
    #[must_use]
    pub fn new(client: HttpClient, html_error_threshold: u64) -> Self {
        Self {
            client,
            html_error_threshold,
        }
    }

    /// Transfers `url` to `dest_dir/filename`, folding errors into the result.
    pub async fn transfer(
        &self,
        url: &str,
        filename: &str,
        dest_dir: &Path,
        options: &TransferOptions,
    ) -> TransferResult {
        let filepath = dest_dir.join(sanitize_filename(filename));
        match self.try_transfer(url, filename, dest_dir, options).await {
            Ok(receipt) => TransferResult {
                success: true,
                filepath: receipt.path,
                bytes_written: receipt.bytes_written,
                error: None,
            },
            Err(error) => {
                warn!(url = %url, error = %error, "transfer failed");
                TransferResult {
                    success: false,
                    filepath,
                    bytes_written: 0,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    /// Transfers `url` to `dest_dir/filename`.
    ///
    /// The filename is sanitized again before use. The destination directory
    /// is created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] for request failures, HTML error pages,
    /// empty bodies, IO failures and interrupted streams. No file is left at
    /// the destination path when an error is returned.
    #[instrument(skip(self, options), fields(url = %url))]
    pub async fn try_transfer(
        &self,
        url: &str,
        filename: &str,
        dest_dir: &Path,
        options: &TransferOptions,
    ) -> Result<TransferReceipt, TransferError> {
        let parsed = Url::parse(url).map_err(|_| TransferError::http(HttpError::invalid_url(url)))?;
        let path = dest_dir.join(sanitize_filename(filename));

        let referer = options.referer.clone().or_else(|| origin(&parsed));
        let mut fetch_options = FetchOptions::transfer()
            .with_header(RANGE, HeaderValue::from_static(FULL_BODY_RANGE))
            .with_header(ACCEPT, HeaderValue::from_static("*/*"));
        if let Some(value) = referer.as_deref().and_then(|r| HeaderValue::from_str(r).ok()) {
            fetch_options = fetch_options.with_header(REFERER, value);
        }

        let response = self
            .client
            .fetch(url, &fetch_options)
            .await
            .map_err(TransferError::http)?;

        let status = response.status().as_u16();
        let total_bytes = response.content_length();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        debug!(status, ?total_bytes, ?content_type, "transfer response received");

        let expected_bytes = if status == 206 {
            let raw_range = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok());
            match raw_range {
                None => total_bytes,
                Some(raw) => match ContentRange::parse(raw) {
                    Some(range) if range.covers_whole_file() => Some(range.len()),
                    _ => {
                        return Err(TransferError::PartialContent {
                            url: url.to_string(),
                            content_range: raw.to_string(),
                        });
                    }
                },
            }
        } else {
            None
        };

        let mut stream = response.bytes_stream();
        let mut prefix: Vec<Bytes> = Vec::new();

        if content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
        {
            let mut observed: u64 = 0;
            let mut ended = true;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| TransferError::stream(url, 0, e))?;
                observed += chunk.len() as u64;
                prefix.push(chunk);
                if observed >= self.html_error_threshold {
                    ended = false;
                    break;
                }
            }

            let declared_small = total_bytes.is_some_and(|len| len < self.html_error_threshold);
            if ended || declared_small {
                return Err(TransferError::ErrorPage {
                    url: url.to_string(),
                    content_type: content_type.unwrap_or_default(),
                    bytes: observed,
                    excerpt: excerpt(&prefix),
                });
            }
        }

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| TransferError::io(dest_dir, e))?;
        let file = File::create(&path)
            .await
            .map_err(|e| TransferError::io(path.clone(), e))?;

        let written = write_body(file, prefix, stream, url, &path, total_bytes, options).await;
        let bytes_written = match written {
            Ok(bytes) => bytes,
            Err(error) => {
                remove_partial(&path).await;
                return Err(error);
            }
        };

        if let Some(expected) = expected_bytes.filter(|&expected| expected != bytes_written) {
            remove_partial(&path).await;
            return Err(TransferError::Incomplete {
                url: url.to_string(),
                bytes_written,
                expected,
            });
        }

        let on_disk = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
        if bytes_written == 0 || on_disk == 0 {
            remove_partial(&path).await;
            return Err(TransferError::EmptyBody {
                url: url.to_string(),
            });
        }

        info!(path = %path.display(), bytes = bytes_written, "transfer complete");
        Ok(TransferReceipt {
            path,
            bytes_written,
            total_bytes,
            content_type,
        })
    }
}

/// Writes the buffered prefix then the remaining stream, reporting progress.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
async fn write_body<S>(
    file: File,
    prefix: Vec<Bytes>,
    mut stream: S,
    url: &str,
    path: &Path,
    total_bytes: Option<u64>,
    options: &TransferOptions,
) -> Result<u64, TransferError>
where
    S: futures_util::Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    let mut writer = BufWriter::new(file);
    let mut bytes_written: u64 = 0;
    let mut next_log = PROGRESS_LOG_INTERVAL_BYTES;
    let mut last_decile: u8 = 0;

    let mut pending = prefix.into_iter();
    loop {
        let chunk = match pending.next() {
            Some(chunk) => chunk,
            None => match stream.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => return Err(TransferError::stream(url, bytes_written, e)),
                None => break,
            },
        };

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| TransferError::io(path, e))?;
        bytes_written += chunk.len() as u64;

        let progress = TransferProgress {
            bytes_written,
            total_bytes,
        };
        if let Some(sink) = &options.progress {
            sink(progress);
        }
        trace!(bytes_written, fraction = ?progress.fraction(), "chunk written");
        match progress.fraction() {
            Some(fraction) => {
                let decile = (fraction * 10.0).floor() as u8;
                if decile > last_decile {
                    debug!(bytes_written, percent = u32::from(decile) * 10, "transfer progress");
                    last_decile = decile;
                }
            }
            None if bytes_written >= next_log => {
                debug!(bytes_written, "transfer progress");
                next_log += PROGRESS_LOG_INTERVAL_BYTES;
            }
            None => {}
        }
    }

    writer.flush().await.map_err(|e| TransferError::io(path, e))?;
    Ok(bytes_written)
}

/// Deletes a file left by a failed transfer.
async fn remove_partial(path: &Path) {
    debug!(path = %path.display(), "cleaning up partial file after error");
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove partial file");
    }
}

/// A `Content-Range: bytes <start>-<end>/<total>` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ContentRange {
    start: u64,
    end: u64,
    /// `None` when the server sent `*`.
    total: Option<u64>,
}

impl ContentRange {
    fn parse(raw: &str) -> Option<Self> {
        let rest = raw.trim().strip_prefix("bytes")?.trim_start();
        let (range, total) = rest.split_once('/')?;
        let (start, end) = range.trim().split_once('-')?;
        let start: u64 = start.trim().parse().ok()?;
        let end: u64 = end.trim().parse().ok()?;
        if end < start {
            return None;
        }
        let total = match total.trim() {
            "*" => None,
            value => Some(value.parse().ok()?),
        };
        Some(Self { start, end, total })
    }

    fn len(self) -> u64 {
        self.end - self.start + 1
    }

    fn covers_whole_file(self) -> bool {
        self.start == 0 && self.total.is_none_or(|total| self.end + 1 == total)
    }
}

fn excerpt(chunks: &[Bytes]) -> String {
    let raw: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
    let text = String::from_utf8_lossy(&raw);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(ERROR_EXCERPT_CHARS).collect()
}
