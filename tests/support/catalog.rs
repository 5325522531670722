//! Mock MangaDex catalog built on wiremock.

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One chapter served by the mock catalog.
pub struct MockChapter {
    pub id: &'static str,
    pub volume: &'static str,
    pub number: &'static str,
    pub pages: Vec<&'static str>,
}

impl MockChapter {
    pub fn new(
        id: &'static str,
        volume: &'static str,
        number: &'static str,
        pages: &[&'static str],
    ) -> Self {
        Self {
            id,
            volume,
            number,
            pages: pages.to_vec(),
        }
    }

    fn record(&self) -> Value {
        json!({
            "id": self.id,
            "type": "chapter",
            "attributes": {
                "volume": self.volume,
                "chapter": self.number,
                "title": format!("Chapter {}", self.number),
                "translatedLanguage": "en",
                "pages": self.pages.len()
            }
        })
    }
}

/// Mounts a single-page chapter listing for `work_id`.
pub async fn mount_listing(server: &MockServer, work_id: &str, chapters: &[MockChapter]) {
    let data: Vec<Value> = chapters.iter().map(MockChapter::record).collect();
    Mock::given(method("GET"))
        .and(path("/chapter"))
        .and(query_param("manga", work_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "response": "collection",
            "data": data,
            "limit": 100,
            "offset": 0,
            "total": chapters.len()
        })))
        .mount(server)
        .await;
}

/// Mounts metadata, at-home and image endpoints for each chapter.
///
/// Image bodies are `"{chapter id}:{file name}"`.
pub async fn mount_chapters(server: &MockServer, chapters: &[MockChapter]) {
    for chapter in chapters {
        Mock::given(method("GET"))
            .and(path(format!("/chapter/{}", chapter.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "ok",
                "response": "entity",
                "data": chapter.record()
            })))
            .mount(server)
            .await;

        let hash = format!("hash-{}", chapter.id);
        Mock::given(method("GET"))
            .and(path(format!("/at-home/server/{}", chapter.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "ok",
                "baseUrl": server.uri(),
                "chapter": {
                    "hash": hash,
                    "data": chapter.pages,
                    "dataSaver": chapter.pages
                }
            })))
            .mount(server)
            .await;

        for page in &chapter.pages {
            Mock::given(method("GET"))
                .and(path(format!("/data/{hash}/{page}")))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string(format!("{}:{page}", chapter.id)),
                )
                .mount(server)
                .await;
        }
    }
}

/// Mounts a complete work: listing plus every chapter.
pub async fn mount_work(server: &MockServer, work_id: &str, chapters: &[MockChapter]) {
    mount_listing(server, work_id, chapters).await;
    mount_chapters(server, chapters).await;
}
