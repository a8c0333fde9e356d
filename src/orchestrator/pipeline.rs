//! One resolution + transfer run for one request id.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::task::JoinError;
use tracing::{info, instrument, warn};

use crate::download::{ProgressSink, TransferOptions, TransferProgress};
use crate::engine::ShareEngine;

use super::status::{NOT_FOUND_MESSAGE, RequestId, StatusRecord};
use super::store::StatusStore;

/// Inputs owned by a pipeline run.
#[derive(Debug)]
pub(crate) struct PipelineJob {
    pub id: RequestId,
    pub source_url: String,
    pub download_dir: PathBuf,
}

/// Runs the pipeline in its own task and converts a panic into a failed record.
pub(crate) async fn run_guarded(engine: Arc<ShareEngine>, store: Arc<StatusStore>, job: PipelineJob) {
    let id = job.id;
    let inner = tokio::spawn(run_pipeline(engine, Arc::clone(&store), job));
    if let Err(join_error) = inner.await {
        let detail = join_error_detail(join_error);
        warn!(request_id = %id, error = %detail, "pipeline aborted");
        store.transition(
            id,
            StatusRecord::failed(format!("Unexpected error: {detail}"), None),
        );
    }
}

/// Extraction, then resolution, then transfer. Every outcome ends in a
/// terminal record.
#[instrument(skip(engine, store, job), fields(request_id = %job.id, url = %job.source_url))]
pub(crate) async fn run_pipeline(engine: Arc<ShareEngine>, store: Arc<StatusStore>, job: PipelineJob) {
    let PipelineJob {
        id,
        source_url,
        download_dir,
    } = job;

    store.transition(id, StatusRecord::resolving());
    let info = match engine.extract_file_info(&source_url).await {
        Ok(info) => info,
        Err(error) => {
            store.transition(
                id,
                StatusRecord::failed(format!("Error extracting file info: {error}"), None),
            );
            return;
        }
    };
    let filename = info.filename.clone();

    store.transition(id, StatusRecord::locating_url(&filename));
    let resolution = match engine
        .resolve_download_url(&info.final_url, Some(&info.page.raw_markup))
        .await
    {
        Ok(resolution) => resolution,
        Err(error) => {
            store.transition(
                id,
                StatusRecord::failed(format!("Error finding download URL: {error}"), Some(&filename)),
            );
            return;
        }
    };
    let Some(target) = resolution.into_target() else {
        store.transition(id, StatusRecord::failed(NOT_FOUND_MESSAGE, Some(&filename)));
        return;
    };

    store.transition(id, StatusRecord::downloading(&filename, None));
    let options = TransferOptions::default()
        .with_referer(info.final_url)
        .with_progress(progress_sink(Arc::clone(&store), id, filename.clone()));

    let result = engine
        .fetch_file(&target.url, &filename, &download_dir, &options)
        .await;

    if result.success {
        info!(path = %result.filepath.display(), bytes = result.bytes_written, "request completed");
        store.transition(
            id,
            StatusRecord::completed(&filename, &result.filepath, result.bytes_written),
        );
    } else {
        let reason = result.error.unwrap_or_else(|| "unknown error".to_string());
        store.transition(
            id,
            StatusRecord::failed(format!("Download failed: {reason}"), Some(&filename)),
        );
    }
}

/// Updates the downloading record each time the whole-percent value changes.
fn progress_sink(
    store: Arc<StatusStore>,
    id: RequestId,
    filename: String,
) -> ProgressSink {
    let last_percent = AtomicU8::new(0);
    Arc::new(move |progress: TransferProgress| {
        let Some(fraction) = progress.fraction() else {
            return;
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (fraction * 100.0).floor() as u8;
        if last_percent.swap(percent, Ordering::Relaxed) != percent {
            store.transition(id, StatusRecord::downloading(&filename, Some(fraction)));
        }
    })
}

fn join_error_detail(error: JoinError) -> String {
    if error.is_cancelled() {
        return "pipeline task was cancelled".to_string();
    }
    match error.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(error) => error.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "pipeline panicked".to_string()
    }
}
