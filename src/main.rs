//! CLI entry point for the sharegrab tool.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sharegrab_core::{
    EngineConfig, Orchestrator, OrchestratorConfig, PacingConfig, Resolution, RequestState,
    ShareEngine, StatusStore, validate_source_url,
};
use sharegrab_core::orchestrator::NOT_FOUND_MESSAGE;
use tracing::{debug, error, info};

mod app_config;
mod cli;
mod progress;

use app_config::{FileConfig, load_config};
use cli::Args;
use progress::{TrackedRequest, track_requests};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded = load_config(args.config.as_deref())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config file > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => loaded
                .config
                .verbosity
                .map_or("info", app_config::VerbositySetting::log_level),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");
    if loaded.loaded_from_file {
        debug!(path = ?loaded.path, "loaded config file");
    }

    let engine_config = engine_config(&args, &loaded.config);
    let orchestrator_config = orchestrator_config(&args, &loaded.config);

    let mut rejected = 0usize;
    let mut accepted = Vec::new();
    for raw in &args.urls {
        match validate_source_url(raw, &orchestrator_config.allowed_hosts) {
            Ok(url) => accepted.push(url.to_string()),
            Err(e) => {
                error!(url = %raw, "{e}");
                rejected += 1;
            }
        }
    }
    if accepted.is_empty() {
        error!("No valid share URLs given");
        return Ok(ExitCode::FAILURE);
    }

    let engine = Arc::new(ShareEngine::new(engine_config).context("Failed to build HTTP client")?);

    let failed = if args.resolve_only {
        resolve_only(&engine, &accepted).await
    } else {
        download_all(engine, orchestrator_config, &accepted, !args.quiet).await?
    };

    if failed + rejected > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn engine_config(args: &Args, file: &FileConfig) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.verify_tls = !args.insecure && file.verify_tls.unwrap_or(true);
    if args.no_pacing || file.pacing == Some(false) {
        config.pacing = PacingConfig::Disabled;
    }
    if let Some(secs) = args.page_timeout.or(file.page_timeout_secs) {
        config.page_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.transfer_timeout.or(file.transfer_timeout_secs) {
        config.transfer_timeout = Duration::from_secs(secs);
    }
    config
}

fn orchestrator_config(args: &Args, file: &FileConfig) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    if let Some(dir) = args.output_dir.clone().or_else(|| file.output_dir.clone()) {
        config.download_dir = dir;
    }
    if args.any_host {
        config.allowed_hosts.clear();
    } else if let Some(hosts) = &file.allowed_hosts {
        config.allowed_hosts.clone_from(hosts);
    }
    config
}

/// Prints `<filename>\t<direct url>` per link. Returns the number of failures.
async fn resolve_only(engine: &ShareEngine, urls: &[String]) -> usize {
    let mut failed = 0;
    for url in urls {
        let info = match engine.extract_file_info(url).await {
            Ok(info) => info,
            Err(e) => {
                error!(url = %url, "Error extracting file info: {e}");
                failed += 1;
                continue;
            }
        };
        match engine
            .resolve_download_url(&info.final_url, Some(&info.page.raw_markup))
            .await
        {
            Ok(Resolution::Found(target)) => println!("{}\t{}", info.filename, target.url),
            Ok(Resolution::NotFound { strategies_tried }) => {
                error!(url = %url, ?strategies_tried, "{NOT_FOUND_MESSAGE}");
                failed += 1;
            }
            Err(e) => {
                error!(url = %url, "Error finding download URL: {e}");
                failed += 1;
            }
        }
    }
    failed
}

/// Runs every link through the orchestrator and prints a summary. Returns the number of failures.
async fn download_all(
    engine: Arc<ShareEngine>,
    config: OrchestratorConfig,
    urls: &[String],
    show_bars: bool,
) -> Result<usize> {
    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory '{}'",
                config.download_dir.display()
            )
        })?;

    let orchestrator = Orchestrator::new(engine, Arc::new(StatusStore::new()), config);
    let mut requests = Vec::with_capacity(urls.len());
    for url in urls {
        let id = orchestrator
            .submit(url)
            .with_context(|| format!("Failed to submit '{url}'"))?;
        requests.push(TrackedRequest {
            url: url.clone(),
            id,
        });
    }

    let show_bars = show_bars && io::stderr().is_terminal();
    let records = track_requests(&orchestrator, &requests, show_bars).await;

    let mut failed = 0;
    for (request, record) in requests.iter().zip(&records) {
        match (record.state, &record.filepath) {
            (RequestState::Completed, Some(path)) => {
                println!("{}: {} -> {}", request.url, record.message, path.display());
            }
            _ => {
                failed += 1;
                println!("{}: {}", request.url, record.message);
            }
        }
    }

    info!(
        completed = records.len() - failed,
        failed,
        total = records.len(),
        "Download complete"
    );
    Ok(failed)
}
