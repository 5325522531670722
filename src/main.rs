//! CLI entry point for the MangaDex downloader.

use anyhow::Result;
use clap::Parser;
use mangadex_core::Pipeline;
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    match args.command {
        Command::Get(get) => {
            let request = get.into_request()?;
            info!(
                work_id = request.work_id(),
                language = %request.language(),
                volume = request.volume_filter().unwrap_or("all"),
                "Downloading work"
            );

            let summary = Pipeline::new(request).run().await?;

            for archive in &summary.archives {
                info!(path = %archive.display(), "Archive written");
            }
            info!(
                archives = summary.archives.len(),
                chapters = summary.chapters_retained,
                skipped = summary.chapters_skipped,
                "Download complete"
            );
        }
    }

    Ok(())
}
