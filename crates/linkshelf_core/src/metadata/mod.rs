//! Page metadata retrieval.
//!
//! # Responsibility
//! - Define the fetcher contract used when a resource is created.
//! - Provide the default HTTP + HTML implementation.
//!
//! # Invariants
//! - Missing tags yield empty strings, never errors.
//! - Fetch failures are reported once; the core does not retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod http;

pub use http::{parse_metadata, HttpMetadataFetcher};

/// Title/description/image scraped from a page, as published by the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    /// May be relative; callers normalize before persisting.
    pub image: String,
}

/// Failure while retrieving page metadata.
#[derive(Debug)]
pub enum FetchError {
    /// HTTP client could not be constructed.
    Client(String),
    Request { url: String, source: reqwest::Error },
    Status { url: String, status: u16 },
    Body { url: String, source: reqwest::Error },
    /// Failure reported by a non-HTTP fetcher implementation.
    Other(String),
}

impl FetchError {
    /// Stable identifier for log lines; never carries the fetched URL.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Client(_) => "fetch_client_failed",
            Self::Request { .. } => "fetch_request_failed",
            Self::Status { .. } => "fetch_bad_status",
            Self::Body { .. } => "fetch_body_failed",
            Self::Other(_) => "fetch_failed",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client(message) => write!(f, "failed to build metadata client: {message}"),
            Self::Request { url, source } => write!(f, "failed to fetch `{url}`: {source}"),
            Self::Status { url, status } => write!(f, "fetching `{url}` returned HTTP {status}"),
            Self::Body { url, source } => {
                write!(f, "failed to read response body of `{url}`: {source}")
            }
            Self::Other(message) => f.write_str(message),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Request { source, .. } | Self::Body { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Metadata fetcher consulted by `create`.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageMetadata, FetchError>;
}
