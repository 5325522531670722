//! Chapter page download.
//!
//! A chapter's pages are resolved through the at-home endpoint (base URL,
//! hash and ordered file names) and written one by one, in server order, into
//! a fresh temporary directory owned by the returned [`ChapterPageSet`].

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tempfile::TempDir;
use tracing::{debug, instrument};

use crate::catalog::models::AtHomeResponse;
use crate::catalog::{CatalogClient, CatalogError};
use crate::config::ImageQuality;

/// Prefix for per-chapter temporary directories.
const TEMP_DIR_PREFIX: &str = "mangadex";

/// Where and how to fetch one chapter's images.
///
/// Issued by the image server per session and only valid for a limited time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    /// Image server base URL.
    pub base_url: String,
    /// Chapter hash used in image paths.
    pub hash: String,
    /// Page file names in reading order.
    pub pages: Vec<String>,
}

impl PageDescriptor {
    /// Builds the URL of one page.
    #[must_use]
    pub fn page_url(&self, quality: ImageQuality, file_name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            quality.path_segment(),
            self.hash,
            file_name
        )
    }
}

/// The downloaded pages of one chapter, stored in an exclusive temporary
/// directory.
///
/// Dropping the set removes the directory best-effort; [`close`](Self::close)
/// removes it and reports failure.
#[derive(Debug)]
pub struct ChapterPageSet {
    chapter_id: String,
    dir: TempDir,
    pages: Vec<PathBuf>,
}

impl ChapterPageSet {
    /// Wraps an already-populated directory.
    #[must_use]
    pub fn new(chapter_id: impl Into<String>, dir: TempDir, pages: Vec<PathBuf>) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            dir,
            pages,
        }
    }

    #[must_use]
    pub fn chapter_id(&self) -> &str {
        &self.chapter_id
    }

    /// Directory holding the page files.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Page files in reading order.
    #[must_use]
    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    /// Deletes the directory and its contents.
    ///
    /// # Errors
    ///
    /// Returns the IO error if removal fails.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// Downloads chapter pages through a [`CatalogClient`].
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: CatalogClient,
    quality: ImageQuality,
    show_progress: bool,
    temp_root: Option<PathBuf>,
}

impl PageFetcher {
    #[must_use]
    pub fn new(client: CatalogClient, quality: ImageQuality, show_progress: bool) -> Self {
        Self {
            client,
            quality,
            show_progress,
            temp_root: None,
        }
    }

    /// Creates chapter directories under `root` instead of the system
    /// temporary directory.
    #[must_use]
    pub fn with_temp_root(mut self, root: Option<PathBuf>) -> Self {
        self.temp_root = root;
        self
    }

    #[must_use]
    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    /// Resolves the image server and page order for a chapter.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on request or decode failure.
    pub async fn resolve_descriptor(
        &self,
        chapter_id: &str,
    ) -> Result<PageDescriptor, CatalogError> {
        debug!(chapter_id, "fetching image list via at-home API");
        let url = self.client.endpoint(&format!(
            "at-home/server/{}",
            urlencoding::encode(chapter_id)
        ))?;
        let at_home: AtHomeResponse = self.client.get_json(&url).await?;

        let pages = match self.quality {
            ImageQuality::Data => at_home.chapter.data,
            ImageQuality::DataSaver => at_home.chapter.data_saver,
        };

        Ok(PageDescriptor {
            base_url: at_home.base_url,
            hash: at_home.chapter.hash,
            pages,
        })
    }

    /// Downloads every page of a chapter into a new temporary directory.
    ///
    /// Pages are stored as `{index:03}_{file name}` with the index starting at
    /// 1. Any page failure aborts the chapter and the directory is removed.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when resolution or any page download fails,
    /// or the temporary directory cannot be created.
    #[instrument(skip(self))]
    pub async fn fetch_pages(&self, chapter_id: &str) -> Result<ChapterPageSet, CatalogError> {
        let descriptor = self.resolve_descriptor(chapter_id).await?;

        let root = self.temp_root.clone().unwrap_or_else(std::env::temp_dir);
        let dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir_in(&root)
            .map_err(|e| CatalogError::io(root, e))?;

        let progress = self.progress_bar(descriptor.pages.len());
        let mut pages = Vec::with_capacity(descriptor.pages.len());

        for (index, file_name) in descriptor.pages.iter().enumerate() {
            let url = descriptor.page_url(self.quality, file_name);
            let target = dir.path().join(page_file_name(index + 1, file_name));
            debug!(url = %url, "downloading image");

            self.client.download_to_file(&url, &target).await?;

            debug!(file = %target.display(), "saved image");
            pages.push(target);
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(ChapterPageSet::new(chapter_id, dir, pages))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(
            ProgressStyle::with_template("Downloading [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    }
}

/// Local name for a page: 1-based, 3-digit index plus the server file name
/// with path separators neutralized.
#[must_use]
pub fn page_file_name(index: usize, server_name: &str) -> String {
    let safe = crate::volume::normalize_volume_label(server_name);
    let safe = if matches!(safe.as_str(), "" | "." | "..") {
        "_".to_string()
    } else {
        safe
    };
    format!("{index:03}_{safe}")
}
