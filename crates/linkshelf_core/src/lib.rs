//! Core logic for linkshelf, a store of bookmarked links.
//! This crate owns the resource repository and every rule it enforces.

pub mod config;
pub mod db;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod url_utils;
pub mod validation;

pub use config::{BootstrapError, ConfigError, LinkshelfConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use metadata::{FetchError, HttpMetadataFetcher, MetadataFetcher, PageMetadata};
pub use model::resource::{Resource, ResourceId, ResourceMeta, VoteKind};
pub use repo::resource_store::{
    ResourceQuery, ResourceStore, SqliteResourceStore, StoreError, StoreResult,
};
pub use search::pattern::{SearchError, SearchPattern};
pub use service::envelope::{
    Affected, CreatedResource, Envelope, FailureContext, Outcome, ResourceCount, ResourceList,
    ResourcePage, VotesCount, GENERIC_FAILURE_MESSAGE,
};
pub use service::error::ResourceError;
pub use service::resource_repository::ResourceRepository;
pub use url_utils::{StandardUrlUtilities, UrlUtilities};
pub use validation::{ResourceValidator, RuleValidator, ValidatedField, ValidationError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
