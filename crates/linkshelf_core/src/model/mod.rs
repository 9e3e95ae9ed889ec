//! Domain model for bookmarked resources.
//!
//! # Responsibility
//! - Define canonical data structures used by the store and handlers.
//!
//! # Invariants
//! - Every resource is addressed by its `link`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod resource;
