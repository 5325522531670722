//! MangaDex Downloader Core Library
//!
//! This library downloads a work from the MangaDex catalog and packages it as
//! one CBZ archive per volume.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Validated work request and defaults
//! - [`catalog`] - HTTP client with rate-limit retries, wire records, errors
//! - [`chapters`] - Paginated chapter listing and per-chapter metadata
//! - [`pages`] - At-home resolution and page download into temporary dirs
//! - [`volume`] - Grouping of downloaded chapters by volume label
//! - [`archive`] - CBZ assembly with sequential entry names
//! - [`pipeline`] - Sequential end-to-end run for one work

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod catalog;
pub mod chapters;
pub mod config;
pub mod pages;
pub mod pipeline;
pub mod volume;

mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use archive::{ArchiveError, archive_file_name};
pub use catalog::{CatalogClient, CatalogError, FailureType, RetryDecision, RetryPolicy};
pub use chapters::{ChapterMetadata, list_chapters, resolve_chapter};
pub use config::{
    ConfigError, DEFAULT_API_URL, DEFAULT_MAX_RETRIES, ImageQuality, Language, WorkRequest,
};
pub use pages::{ChapterPageSet, PageFetcher};
pub use pipeline::{Pipeline, PipelineError, RunSummary};
pub use volume::{ChapterSource, VolumeGroups, normalize_volume_label};
