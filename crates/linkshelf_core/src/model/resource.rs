//! Resource domain model.
//!
//! # Responsibility
//! - Define the bookmarked-link record shared by store, handlers and callers.
//! - Provide vote tally helpers used by aggregate queries.
//!
//! # Invariants
//! - `link` is the external identity; `id` is never used for targeting.
//! - `upvotes`/`downvotes` keep append order and may hold duplicates.
//! - `created_at` is set once at construction.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Internal document identifier.
pub type ResourceId = Uuid;

/// Page metadata persisted alongside a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub title: String,
    pub description: String,
    /// Absolute URL, resolved against the resource's own origin.
    pub image: String,
}

/// Bookmarked link with fetched metadata, author and vote lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    pub link: String,
    pub author: String,
    pub meta: ResourceMeta,
    /// User ids in the order their upvotes arrived.
    pub upvotes: Vec<String>,
    /// User ids in the order their downvotes arrived.
    pub downvotes: Vec<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Resource {
    /// Creates a resource with a generated id, no votes, and `created_at = now`.
    pub fn new(link: impl Into<String>, author: impl Into<String>, meta: ResourceMeta) -> Self {
        Self {
            id: Uuid::new_v4(),
            link: link.into(),
            author: author.into(),
            meta,
            upvotes: Vec::new(),
            downvotes: Vec::new(),
            created_at: now_epoch_ms(),
        }
    }

    pub fn upvote_count(&self) -> usize {
        self.upvotes.len()
    }

    pub fn downvote_count(&self) -> usize {
        self.downvotes.len()
    }
}

/// Which vote list a vote is appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    /// Storage tag for the vote kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
