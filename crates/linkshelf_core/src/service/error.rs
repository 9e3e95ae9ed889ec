//! Handler-level failure taxonomy.

use crate::metadata::FetchError;
use crate::repo::resource_store::StoreError;
use crate::search::pattern::SearchError;
use crate::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why a resource handler failed.
#[derive(Debug)]
pub enum ResourceError {
    /// Input failed the validation gateway; caller-correctable.
    Validation(ValidationError),
    /// Remote metadata fetch failed; not retried.
    MetadataFetch(FetchError),
    /// The store reported an error; not retried or classified further.
    Persistence(StoreError),
    /// Page number or limit below 1.
    InvalidPage { page_number: u32, limit: u32 },
    Search(SearchError),
}

impl ResourceError {
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Stable identifier for log lines; never carries user input.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::MetadataFetch(err) => err.code(),
            Self::Persistence(_) => "persistence_failed",
            Self::InvalidPage { .. } => "invalid_page",
            Self::Search(_) => "invalid_search_pattern",
        }
    }
}

impl Display for ResourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::MetadataFetch(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::InvalidPage { page_number, limit } => write!(
                f,
                "page number and limit must be at least 1 (got page {page_number}, limit {limit})"
            ),
            Self::Search(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::MetadataFetch(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::InvalidPage { .. } => None,
            Self::Search(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ResourceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<FetchError> for ResourceError {
    fn from(value: FetchError) -> Self {
        Self::MetadataFetch(value)
    }
}

impl From<StoreError> for ResourceError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value)
    }
}

impl From<SearchError> for ResourceError {
    fn from(value: SearchError) -> Self {
        Self::Search(value)
    }
}
