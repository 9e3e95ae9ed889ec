//! Resource use-case handlers.
//!
//! # Responsibility
//! - Orchestrate validation, metadata fetch and store calls per operation.
//! - Keep callers decoupled from storage details behind one envelope shape.

pub mod envelope;
pub mod error;
pub mod resource_repository;
