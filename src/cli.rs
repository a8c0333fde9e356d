//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Resolve file-hosting share links and download the files they point to.
///
/// Each URL is fetched as a share page, the file name and direct download
/// link are extracted from the markup, and the file is streamed to the
/// output directory.
#[derive(Parser, Debug)]
#[command(name = "sharegrab")]
#[command(author, version, about)]
pub struct Args {
    /// Share-page URLs to download
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,

    /// Directory downloaded files are written to
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Accept invalid or self-signed TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Disable randomized request delays and identity rotation
    #[arg(long)]
    pub no_pacing: bool,

    /// Accept share links on any host, not just the known share-link family
    #[arg(long)]
    pub any_host: bool,

    /// Total timeout for share-page fetches in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub page_timeout: Option<u64>,

    /// Total timeout for file transfers in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub transfer_timeout: Option<u64>,

    /// Read defaults from this config file instead of the standard location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the file name and direct download URL without downloading
    #[arg(long)]
    pub resolve_only: bool,
}
