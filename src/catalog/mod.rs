//! Catalog access: HTTP client, retry policy, wire records and errors.
//!
//! # Features
//!
//! - One client per run, built from the [`WorkRequest`](crate::WorkRequest)
//!   timeout and retry settings
//! - Rate-limit (HTTP 429) retries with a fixed cooldown and interval
//! - Envelope-checked JSON decoding of catalog records
//! - Streaming image downloads straight to disk

mod client;
mod error;
pub(crate) mod models;
mod retry;

pub use client::CatalogClient;
pub use error::CatalogError;
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
