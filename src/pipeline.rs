//! End-to-end run for one work: list, aggregate, archive, clean up.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, instrument};

use crate::archive::{self, ArchiveError};
use crate::catalog::{CatalogClient, CatalogError};
use crate::chapters;
use crate::config::WorkRequest;
use crate::pages::PageFetcher;
use crate::volume;

/// Terminal failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A chapter directory could not be removed after its archive was written.
    #[error("failed to remove temporary directory {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking archive task panicked or was cancelled.
    #[error("archive task failed: {0}")]
    Task(#[from] JoinError),
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Archives written, in processing order.
    pub archives: Vec<PathBuf>,
    /// Chapters downloaded and archived.
    pub chapters_retained: usize,
    /// Chapters skipped by the volume filter.
    pub chapters_skipped: usize,
}

/// Sequential download pipeline for a single [`WorkRequest`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    request: WorkRequest,
}

impl Pipeline {
    #[must_use]
    pub fn new(request: WorkRequest) -> Self {
        Self { request }
    }

    #[must_use]
    pub fn request(&self) -> &WorkRequest {
        &self.request
    }

    /// Downloads the work and writes one archive per volume.
    ///
    /// Each volume's chapter directories are removed right after its archive
    /// is written; a failed removal ends the run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] on the first catalog, archive or cleanup
    /// failure. Archives written before the failure stay on disk.
    #[instrument(skip(self), fields(work_id = %self.request.work_id()))]
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let request = &self.request;
        let client = CatalogClient::new(request)?;

        let chapter_ids = chapters::list_chapters(
            &client,
            request.work_id(),
            request.language(),
            request.catalog_volume(),
        )
        .await?;
        info!(chapters = chapter_ids.len(), "chapters listed");

        let fetcher = PageFetcher::new(client, request.image_quality(), request.show_progress())
            .with_temp_root(request.temp_dir().map(Path::to_path_buf));
        let groups = volume::aggregate(&fetcher, &chapter_ids, request.volume_filter()).await?;

        let mut summary = RunSummary {
            archives: Vec::with_capacity(groups.len()),
            chapters_retained: groups.retained(),
            chapters_skipped: groups.skipped(),
        };

        for group in groups {
            let output = request
                .output_dir()
                .join(archive::archive_file_name(request.base_name(), &group.label));
            let pages: Vec<PathBuf> = group
                .chapters
                .iter()
                .flat_map(|chapter| chapter.pages().iter().cloned())
                .collect();

            let label = group.label.clone();
            let target = output.clone();
            let entries =
                tokio::task::spawn_blocking(move || archive::build(&label, &pages, &target))
                    .await??;
            info!(volume = %group.label, entries, path = %output.display(), "archive written");

            for chapter in group.chapters {
                let path = chapter.path().to_path_buf();
                chapter
                    .close()
                    .map_err(|source| PipelineError::Cleanup {
                        path: path.clone(),
                        source,
                    })?;
                debug!(path = %path.display(), "removed chapter directory");
            }

            summary.archives.push(output);
        }

        Ok(summary)
    }
}
