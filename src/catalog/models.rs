//! MangaDex API response records.
//!
//! Only the fields the pipeline reads are modelled; serde ignores the rest.
//! Nullable catalog strings (volume, chapter, title) decode to empty strings.

use serde::{Deserialize, Deserializer};

/// Envelope check shared by every successful response type.
pub(crate) trait ApiEnvelope {
    /// The envelope `result` field (`"ok"` on success).
    fn result(&self) -> &str;
}

/// `GET /chapter` listing page.
#[derive(Debug, Deserialize)]
pub(crate) struct ChapterListResponse {
    pub result: String,
    pub data: Vec<ChapterData>,
    pub total: u32,
}

/// `GET /chapter/{id}` entity.
#[derive(Debug, Deserialize)]
pub(crate) struct ChapterResponse {
    pub result: String,
    pub data: ChapterData,
}

/// A chapter record as returned by listing and entity endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChapterData {
    pub id: String,
    pub attributes: ChapterAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChapterAttributes {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub volume: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub chapter: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
}

/// `GET /at-home/server/{id}` image-server resolution.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AtHomeResponse {
    pub result: String,
    pub base_url: String,
    pub chapter: AtHomeChapter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AtHomeChapter {
    pub hash: String,
    pub data: Vec<String>,
    #[serde(default)]
    pub data_saver: Vec<String>,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorResponse {
    /// First error's detail, falling back to its title.
    pub(crate) fn first_message(&self) -> Option<String> {
        self.errors
            .first()
            .and_then(|e| e.detail.clone().or_else(|| e.title.clone()))
            .filter(|m| !m.is_empty())
    }
}

impl ApiEnvelope for ChapterListResponse {
    fn result(&self) -> &str {
        &self.result
    }
}

impl ApiEnvelope for ChapterResponse {
    fn result(&self) -> &str {
        &self.result
    }
}

impl ApiEnvelope for AtHomeResponse {
    fn result(&self) -> &str {
        &self.result
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
