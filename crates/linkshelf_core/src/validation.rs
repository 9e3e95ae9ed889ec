//! Input validation gateway.
//!
//! # Responsibility
//! - Judge whether raw link/author input meets the field rules before any
//!   persistence call is made.
//! - Report rejections with a human-readable message callers can show as is.
//!
//! # Invariants
//! - Validation never touches the store.
//! - `validate_resource` checks the link before the author.

use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use url::Url;

pub const MAX_LINK_CHARS: usize = 2048;
pub const MAX_AUTHOR_CHARS: usize = 64;

/// Field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatedField {
    Link,
    Author,
}

/// Rejection produced by a [`ResourceValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: ValidatedField,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: ValidatedField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ValidationError {}

/// Validation gateway consulted by the resource handlers.
#[async_trait]
pub trait ResourceValidator: Send + Sync {
    async fn validate_link(&self, link: &str) -> Result<(), ValidationError>;

    async fn validate_author(&self, author: &str) -> Result<(), ValidationError>;

    /// Combined link + author validation used by create.
    async fn validate_resource(&self, link: &str, author: &str) -> Result<(), ValidationError> {
        self.validate_link(link).await?;
        self.validate_author(author).await
    }
}

/// Default rule set for links and authors.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl RuleValidator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceValidator for RuleValidator {
    async fn validate_link(&self, link: &str) -> Result<(), ValidationError> {
        check_link(link)
    }

    async fn validate_author(&self, author: &str) -> Result<(), ValidationError> {
        check_author(author)
    }
}

/// Applies link rules: present, unpadded, bounded, absolute `http(s)` URL
/// with a host.
///
/// Padded input is rejected, never trimmed: the accepted link is stored as is.
pub fn check_link(link: &str) -> Result<(), ValidationError> {
    if link.trim().is_empty() {
        return Err(ValidationError::new(ValidatedField::Link, "Link is required"));
    }
    if link.trim() != link {
        return Err(ValidationError::new(
            ValidatedField::Link,
            "Link must not have leading or trailing whitespace",
        ));
    }
    if link.chars().count() > MAX_LINK_CHARS {
        return Err(ValidationError::new(
            ValidatedField::Link,
            format!("Link must be at most {MAX_LINK_CHARS} characters"),
        ));
    }

    let invalid = || ValidationError::new(ValidatedField::Link, "Link must be a valid http(s) URL");
    let parsed = Url::parse(link).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }

    Ok(())
}

/// Applies author rules: present, unpadded, bounded, no control characters.
pub fn check_author(author: &str) -> Result<(), ValidationError> {
    if author.trim().is_empty() {
        return Err(ValidationError::new(
            ValidatedField::Author,
            "Author is required",
        ));
    }
    if author.trim() != author {
        return Err(ValidationError::new(
            ValidatedField::Author,
            "Author must not have leading or trailing whitespace",
        ));
    }
    if author.chars().count() > MAX_AUTHOR_CHARS {
        return Err(ValidationError::new(
            ValidatedField::Author,
            format!("Author must be at most {MAX_AUTHOR_CHARS} characters"),
        ));
    }
    if author.chars().any(char::is_control) {
        return Err(ValidationError::new(
            ValidatedField::Author,
            "Author must not contain control characters",
        ));
    }
    Ok(())
}
