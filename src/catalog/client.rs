//! HTTP client for the catalog API and its image servers.
//!
//! One [`CatalogClient`] is built per run from the work request. It applies
//! the request timeout to every call, routes every call through the
//! [`RetryPolicy`], and logs each attempt at debug level.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::models::{ApiEnvelope, ErrorResponse};
use super::{CatalogError, RetryPolicy};
use crate::config::WorkRequest;
use crate::user_agent;

/// Client for catalog and image-server requests.
///
/// # Example
///
/// ```no_run
/// use mangadex_core::{CatalogClient, WorkRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let request = WorkRequest::builder("a1c7c817-4e59-43b7-9365-09675a149a6f", "./out", "one-piece").build()?;
/// let client = CatalogClient::new(&request)?;
/// let response = client.request(reqwest::Method::GET, "ping", None).await?;
/// assert!(response.status().is_success());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: Url,
    retry_policy: RetryPolicy,
}

impl CatalogClient {
    /// Creates a client configured from a work request.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(request: &WorkRequest) -> Result<Self, CatalogError> {
        let retry_policy = RetryPolicy::new(
            request.max_retries(),
            request.rate_limit_cooldown(),
            request.retry_interval(),
        );
        Self::with_policy(request.api_url().clone(), request.timeout(), retry_policy)
    }

    /// Creates a client with an explicit base URL, timeout and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ClientBuild`] if the HTTP client cannot be built.
    pub fn with_policy(
        base_url: Url,
        timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| CatalogError::ClientBuild { source })?;

        Ok(Self {
            client,
            base_url,
            retry_policy,
        })
    }

    /// Returns the retry policy applied to every request.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Resolves a request target against the API base URL.
    ///
    /// Absolute URLs (image servers) are used unchanged; anything else is
    /// treated as a path relative to the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidUrl`] if the target cannot be joined.
    pub fn endpoint(&self, target: &str) -> Result<Url, CatalogError> {
        if let Ok(absolute) = Url::parse(target) {
            return Ok(absolute);
        }
        self.base_url
            .join(target.trim_start_matches('/'))
            .map_err(|_| CatalogError::invalid_url(target))
    }

    /// Sends a request with the retry policy applied.
    ///
    /// Any non-success status is an error; 429 responses are retried by the
    /// policy before giving up.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for transport failures, non-success statuses
    /// and rate limiting that outlasts the retry budget.
    pub async fn request(
        &self,
        method: Method,
        target: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, CatalogError> {
        let url = self.endpoint(target)?;
        self.request_url(method, &url, body).await
    }

    async fn request_url(
        &self,
        method: Method,
        url: &Url,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, CatalogError> {
        self.retry_policy
            .run(url.as_str(), || self.send_once(method.clone(), url, body))
            .await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &Url,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, CatalogError> {
        debug!(method = %method, url = %url, "catalog request");

        let mut request = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response).await;
            return Err(CatalogError::http_status(
                url.as_str(),
                status.as_u16(),
                detail,
            ));
        }

        Ok(response)
    }

    /// Fetches a JSON record and checks its envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Decode`] for malformed bodies and
    /// [`CatalogError::Api`] when the envelope result is not `ok`, in addition
    /// to the errors of [`request`](Self::request).
    pub(crate) async fn get_json<T>(&self, url: &Url) -> Result<T, CatalogError>
    where
        T: DeserializeOwned + ApiEnvelope,
    {
        let response = self.request_url(Method::GET, url, None).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CatalogError::network(url.as_str(), e))?;

        let record: T =
            serde_json::from_slice(&bytes).map_err(|e| CatalogError::decode(url.as_str(), e))?;

        if !record.result().eq_ignore_ascii_case("ok") {
            let detail = serde_json::from_slice::<ErrorResponse>(&bytes)
                .ok()
                .and_then(|e| e.first_message());
            return Err(CatalogError::api(url.as_str(), record.result(), detail));
        }

        Ok(record)
    }

    /// Streams the body at `url` into a new file at `path`.
    ///
    /// A partially written file is removed when the transfer fails.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for request failures and
    /// [`CatalogError::Io`] for filesystem failures.
    #[instrument(skip(self), fields(url = %url, path = %path.display()))]
    pub async fn download_to_file(&self, url: &str, path: &Path) -> Result<u64, CatalogError> {
        let response = self.request(Method::GET, url, None).await?;

        let mut file = File::create(path)
            .await
            .map_err(|e| CatalogError::io(path, e))?;

        let result = stream_to_file(&mut file, response, url, path).await;
        if result.is_err() {
            debug!("cleaning up partial file after error");
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
        }
        result
    }
}

/// Streams a response body to `file`, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: Response,
    url: &str,
    path: &Path,
) -> Result<u64, CatalogError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| CatalogError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| CatalogError::io(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| CatalogError::io(path, e))?;

    Ok(bytes_written)
}

/// Extracts the first message from an error envelope body, if there is one.
async fn error_detail(response: Response) -> Option<String> {
    let bytes = response.bytes().await.ok()?;
    serde_json::from_slice::<ErrorResponse>(&bytes)
        .ok()
        .and_then(|e| e.first_message())
}
