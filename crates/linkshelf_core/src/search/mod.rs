//! Literal substring search support.
//!
//! # Responsibility
//! - Turn user search keys into patterns that match literally.
//! - Keep pattern construction out of the SQL layer.

pub mod pattern;
