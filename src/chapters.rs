//! Chapter listing and per-chapter metadata.
//!
//! [`list_chapters`] pages through the catalog's chapter feed for one work
//! and language, sorting each page by chapter number before collecting the
//! identifiers. [`resolve_chapter`] fetches the attributes the volume
//! aggregator groups by.

use std::cmp::Ordering;

use tracing::{debug, instrument};

use crate::catalog::models::{ChapterListResponse, ChapterResponse};
use crate::catalog::{CatalogClient, CatalogError};
use crate::config::Language;

/// Chapters requested per listing page.
pub const PAGE_SIZE: u32 = 100;

/// Attributes of one chapter needed for grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterMetadata {
    /// Catalog identifier.
    pub id: String,
    /// Volume label as the catalog reports it (empty when unassigned).
    pub volume: String,
    /// Chapter number; may be empty or non-numeric.
    pub chapter: String,
    /// Chapter title; may be empty.
    pub title: String,
}

/// Lists every chapter identifier of a work in the given language.
///
/// Each listing page is ordered with [`compare_chapter_numbers`] before its
/// identifiers are appended; pages are concatenated in the order the server
/// paginates them. A volume constraint, when given, is passed on to the
/// server and not re-checked here.
///
/// # Errors
///
/// Returns [`CatalogError`] if any page request or decode fails.
#[instrument(skip(client, language), fields(language = %language))]
pub async fn list_chapters(
    client: &CatalogClient,
    work_id: &str,
    language: Language,
    volume: Option<&str>,
) -> Result<Vec<String>, CatalogError> {
    let mut chapter_ids = Vec::new();
    let mut offset: u32 = 0;

    loop {
        let mut url = client.endpoint("chapter")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("manga", work_id)
                .append_pair("translatedLanguage[]", language.code())
                .append_pair("limit", &PAGE_SIZE.to_string())
                .append_pair("offset", &offset.to_string())
                .append_pair("order[chapter]", "asc");
            if let Some(volume) = volume {
                query.append_pair("volume[]", volume);
            }
        }

        let mut page: ChapterListResponse = client.get_json(&url).await?;
        debug!(offset, total = page.total, received = page.data.len(), "chapter page");

        sort_by_chapter_number(&mut page.data, |c| c.attributes.chapter.as_str());
        chapter_ids.extend(page.data.into_iter().map(|c| c.id));

        offset += PAGE_SIZE;
        if offset >= page.total {
            break;
        }
    }

    debug!(chapters = chapter_ids.len(), "chapter listing complete");
    Ok(chapter_ids)
}

/// Fetches the metadata for one chapter.
///
/// # Errors
///
/// Returns [`CatalogError`] on network, status or decode failure.
#[instrument(skip(client))]
pub async fn resolve_chapter(
    client: &CatalogClient,
    chapter_id: &str,
) -> Result<ChapterMetadata, CatalogError> {
    let url = client.endpoint(&format!("chapter/{}", urlencoding::encode(chapter_id)))?;
    let response: ChapterResponse = client.get_json(&url).await?;
    let attributes = response.data.attributes;

    Ok(ChapterMetadata {
        id: response.data.id,
        volume: attributes.volume,
        chapter: attributes.chapter,
        title: attributes.title,
    })
}

/// Stable-sorts `items` by the chapter number `key` returns.
pub fn sort_by_chapter_number<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| compare_chapter_numbers(key(a), key(b)));
}

/// Orders chapter numbers: numeric values ascending, then everything that
/// does not parse as a number, ordered among themselves as plain strings.
#[must_use]
pub fn compare_chapter_numbers(a: &str, b: &str) -> Ordering {
    match (parse_chapter_number(a), parse_chapter_number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn parse_chapter_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}
