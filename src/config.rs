//! Work request configuration.
//!
//! A [`WorkRequest`] carries everything the pipeline needs for one work:
//! identifiers, output location, language, retry and timeout settings.
//! It is only obtainable through [`WorkRequestBuilder::build`], which
//! validates every field before any network activity happens.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default MangaDex API base URL.
pub const DEFAULT_API_URL: &str = "https://api.mangadex.org";

/// Default number of additional attempts after a rate-limit response.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Fixed per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wait after the first rate-limit response, before the first retry.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(1);

/// Wait between subsequent retries of a rate-limited request.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Errors raised while assembling a [`WorkRequest`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field was empty or not supplied.
    #[error("missing required setting: {field}")]
    MissingField {
        /// Name of the missing setting.
        field: &'static str,
    },

    /// The language code is not one the catalog download supports.
    #[error("unsupported language '{code}' (supported: en, de)")]
    UnsupportedLanguage {
        /// The rejected code.
        code: String,
    },

    /// The API base URL could not be parsed.
    #[error("invalid API base URL: {url}")]
    InvalidApiUrl {
        /// The rejected URL.
        url: String,
    },
}

/// Translated language of the chapters to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    /// English.
    #[default]
    En,
    /// German.
    De,
}

impl Language {
    /// Returns the catalog language code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "de" => Ok(Self::De),
            _ => Err(ConfigError::UnsupportedLanguage {
                code: s.to_string(),
            }),
        }
    }
}

/// Which image set the at-home server should deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageQuality {
    /// Original quality images (`data`).
    #[default]
    Data,
    /// Compressed images (`data-saver`).
    DataSaver,
}

impl ImageQuality {
    /// Path segment used in image URLs.
    #[must_use]
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::DataSaver => "data-saver",
        }
    }
}

/// Immutable settings for downloading one work.
#[derive(Debug, Clone)]
pub struct WorkRequest {
    work_id: String,
    language: Language,
    volume_filter: Option<String>,
    catalog_volume: Option<String>,
    output_dir: PathBuf,
    base_name: String,
    api_url: Url,
    timeout: Duration,
    max_retries: u32,
    rate_limit_cooldown: Duration,
    retry_interval: Duration,
    image_quality: ImageQuality,
    show_progress: bool,
    temp_dir: Option<PathBuf>,
}

impl WorkRequest {
    /// Starts a builder with the three required settings.
    pub fn builder(
        work_id: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
    ) -> WorkRequestBuilder {
        WorkRequestBuilder {
            work_id: work_id.into(),
            output_dir: output_dir.into(),
            base_name: base_name.into(),
            language: Language::default(),
            volume_filter: None,
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            image_quality: ImageQuality::default(),
            show_progress: true,
            temp_dir: None,
        }
    }

    #[must_use]
    pub fn work_id(&self) -> &str {
        &self.work_id
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    /// Normalized volume label to keep, if filtering.
    #[must_use]
    pub fn volume_filter(&self) -> Option<&str> {
        self.volume_filter.as_deref()
    }

    /// Volume label as supplied, used as the catalog's server-side constraint.
    #[must_use]
    pub fn catalog_volume(&self) -> Option<&str> {
        self.catalog_volume.as_deref()
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn rate_limit_cooldown(&self) -> Duration {
        self.rate_limit_cooldown
    }

    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    #[must_use]
    pub fn image_quality(&self) -> ImageQuality {
        self.image_quality
    }

    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    /// Parent directory for per-chapter temporary directories; the system
    /// temporary directory when unset.
    #[must_use]
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }
}

/// Builder for [`WorkRequest`]; see [`WorkRequest::builder`].
#[derive(Debug, Clone)]
#[must_use]
pub struct WorkRequestBuilder {
    work_id: String,
    output_dir: PathBuf,
    base_name: String,
    language: Language,
    volume_filter: Option<String>,
    api_url: String,
    timeout: Duration,
    max_retries: u32,
    rate_limit_cooldown: Duration,
    retry_interval: Duration,
    image_quality: ImageQuality,
    show_progress: bool,
    temp_dir: Option<PathBuf>,
}

impl WorkRequestBuilder {
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Restricts the download to one volume. Empty strings mean no filter.
    pub fn volume_filter(mut self, volume: Option<impl Into<String>>) -> Self {
        self.volume_filter = volume.map(Into::into).filter(|v| !v.is_empty());
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Overrides the rate-limit waits (cooldown, then interval between retries).
    pub fn retry_delays(mut self, cooldown: Duration, interval: Duration) -> Self {
        self.rate_limit_cooldown = cooldown;
        self.retry_interval = interval;
        self
    }

    pub fn image_quality(mut self, quality: ImageQuality) -> Self {
        self.image_quality = quality;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn temp_dir(mut self, dir: Option<impl Into<PathBuf>>) -> Self {
        self.temp_dir = dir.map(Into::into);
        self
    }

    /// Validates the settings and produces the request.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required field is empty or the API URL
    /// does not parse.
    pub fn build(self) -> Result<WorkRequest, ConfigError> {
        if self.work_id.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "manga" });
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField { field: "output" });
        }
        if self.base_name.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "name" });
        }

        // Relative catalog paths are joined onto this URL, so it must end in '/'.
        let mut base = self.api_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_url = Url::parse(&base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or(ConfigError::InvalidApiUrl { url: self.api_url })?;

        Ok(WorkRequest {
            work_id: self.work_id.trim().to_string(),
            language: self.language,
            volume_filter: self
                .volume_filter
                .as_deref()
                .map(crate::volume::normalize_volume_label),
            catalog_volume: self.volume_filter,
            output_dir: self.output_dir,
            base_name: self.base_name,
            api_url,
            timeout: self.timeout,
            max_retries: self.max_retries,
            rate_limit_cooldown: self.rate_limit_cooldown,
            retry_interval: self.retry_interval,
            image_quality: self.image_quality,
            show_progress: self.show_progress,
            temp_dir: self.temp_dir,
        })
    }
}
