//! Persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the document-store contract the resource handlers consume.
//! - Isolate SQLite query details from handler orchestration.
//!
//! # Invariants
//! - Store APIs return transport errors only; "nothing matched" is reported
//!   as a zero affected count, never as an error.

pub mod resource_store;
