//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use mangadex_core::{
    ConfigError, DEFAULT_API_URL, DEFAULT_MAX_RETRIES, ImageQuality, Language, WorkRequest,
};

/// Download MangaDex works as CBZ archives.
///
/// Chapters are grouped by volume and each volume is written as
/// `{name}-volume-{label}.cbz` in the output directory.
#[derive(Parser, Debug)]
#[command(name = "mangadex-dl")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download a work, one archive per volume
    Get(GetArgs),
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// MangaDex work (manga) identifier
    #[arg(short = 'm', long = "manga")]
    pub manga: String,

    /// Directory the archives are written to (created if missing)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Base name of the archive files
    #[arg(short, long)]
    pub name: String,

    /// Chapter language (en, de)
    #[arg(short, long, default_value = "en")]
    pub language: String,

    /// Maximum retries after a rate-limit response (0-10)
    #[arg(
        short = 'r',
        long = "retries",
        default_value_t = DEFAULT_MAX_RETRIES as u8,
        value_parser = clap::value_parser!(u8).range(0..=10)
    )]
    pub max_retries: u8,

    /// Only download this volume
    #[arg(short = 'v', long)]
    pub volume: Option<String>,

    /// Download compressed images instead of full quality
    #[arg(long)]
    pub data_saver: bool,

    /// Hide per-chapter progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Parent directory for temporary chapter downloads
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Catalog API base URL
    #[arg(long, env = "MANGADEX_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

impl GetArgs {
    /// Converts the arguments into a validated work request.
    pub fn into_request(self) -> Result<WorkRequest, ConfigError> {
        let language: Language = self.language.parse()?;
        let quality = if self.data_saver {
            ImageQuality::DataSaver
        } else {
            ImageQuality::Data
        };

        WorkRequest::builder(self.manga, self.output, self.name)
            .language(language)
            .max_retries(u32::from(self.max_retries))
            .volume_filter(self.volume)
            .image_quality(quality)
            .show_progress(!self.no_progress)
            .temp_dir(self.temp_dir)
            .api_url(self.api_url)
            .build()
    }
}
