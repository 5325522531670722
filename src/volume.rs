//! Volume aggregation.
//!
//! Chapters are resolved and downloaded in listing order and grouped by their
//! normalized volume label. Groups keep first-seen order so archives are
//! produced deterministically.

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::catalog::CatalogError;
use crate::chapters::{self, ChapterMetadata};
use crate::pages::{ChapterPageSet, PageFetcher};

/// Replaces path separators in a volume label with `_`.
///
/// The result is used as filter key, group key and file name component.
#[must_use]
pub fn normalize_volume_label(label: &str) -> String {
    label.replace(['/', '\\'], "_")
}

/// Supplies chapter metadata and downloaded pages to the aggregator.
#[async_trait]
pub trait ChapterSource: Send + Sync {
    /// Fetches the metadata for one chapter.
    async fn metadata(&self, chapter_id: &str) -> Result<ChapterMetadata, CatalogError>;

    /// Downloads every page of one chapter.
    async fn pages(&self, chapter_id: &str) -> Result<ChapterPageSet, CatalogError>;
}

#[async_trait]
impl ChapterSource for PageFetcher {
    async fn metadata(&self, chapter_id: &str) -> Result<ChapterMetadata, CatalogError> {
        chapters::resolve_chapter(self.client(), chapter_id).await
    }

    async fn pages(&self, chapter_id: &str) -> Result<ChapterPageSet, CatalogError> {
        self.fetch_pages(chapter_id).await
    }
}

/// Downloaded chapters sharing one normalized volume label.
#[derive(Debug)]
pub struct VolumeGroup {
    /// Normalized label; empty for chapters without a volume.
    pub label: String,
    /// Page sets in chapter listing order.
    pub chapters: Vec<ChapterPageSet>,
}

/// Volume groups in first-seen order, plus retention counters.
#[derive(Debug, Default)]
pub struct VolumeGroups {
    groups: Vec<VolumeGroup>,
    skipped: usize,
}

impl VolumeGroups {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chapter to the group for `label`, creating it if needed.
    pub fn push(&mut self, label: &str, chapter: ChapterPageSet) {
        if let Some(group) = self.groups.iter_mut().find(|g| g.label == label) {
            group.chapters.push(chapter);
        } else {
            self.groups.push(VolumeGroup {
                label: label.to_string(),
                chapters: vec![chapter],
            });
        }
    }

    fn record_skip(&mut self) {
        self.skipped += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group labels in processing order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.label.as_str())
    }

    pub fn get(&self, label: &str) -> Option<&VolumeGroup> {
        self.groups.iter().find(|g| g.label == label)
    }

    /// Chapters kept across all groups.
    #[must_use]
    pub fn retained(&self) -> usize {
        self.groups.iter().map(|g| g.chapters.len()).sum()
    }

    /// Chapters dropped by the volume filter.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl IntoIterator for VolumeGroups {
    type Item = VolumeGroup;
    type IntoIter = std::vec::IntoIter<VolumeGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Resolves and downloads chapters in order, grouping them by volume.
///
/// With a `filter`, chapters whose normalized label differs are skipped
/// without downloading. Any metadata or page failure aborts the whole
/// aggregation; page sets gathered so far are dropped and their directories
/// removed best-effort.
///
/// # Errors
///
/// Returns the first [`CatalogError`] raised by `source`.
#[instrument(skip(source, chapter_ids), fields(chapters = chapter_ids.len()))]
pub async fn aggregate(
    source: &dyn ChapterSource,
    chapter_ids: &[String],
    filter: Option<&str>,
) -> Result<VolumeGroups, CatalogError> {
    let mut groups = VolumeGroups::new();

    for chapter_id in chapter_ids {
        let metadata = source.metadata(chapter_id).await?;
        let label = normalize_volume_label(&metadata.volume);

        if filter.is_some_and(|wanted| label != wanted) {
            info!(
                chapter = %metadata.chapter,
                volume = %label,
                "skipping chapter outside requested volume"
            );
            groups.record_skip();
            continue;
        }

        debug!(
            chapter_id = %chapter_id,
            chapter = %metadata.chapter,
            title = %metadata.title,
            volume = %label,
            "downloading chapter"
        );
        let pages = source.pages(chapter_id).await?;
        groups.push(&label, pages);
    }

    Ok(groups)
}
