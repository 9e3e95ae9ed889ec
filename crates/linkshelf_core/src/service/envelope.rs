//! Uniform response envelope and handler payloads.
//!
//! # Invariants
//! - `error == false` always comes with a payload.
//! - A handler yields exactly one [`Outcome`]: `Ok` for success envelopes,
//!   `Err` for failure envelopes.

use crate::model::resource::Resource;
use serde::Serialize;

/// Message used when a persistence failure is not threaded through.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again later";

/// `{error, message, payload?}` result shape shared by every handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope<P> {
    pub error: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<P>,
}

impl<P> Envelope<P> {
    pub fn success(message: impl Into<String>, payload: P) -> Self {
        Self {
            error: false,
            message: message.into(),
            payload: Some(payload),
        }
    }

    pub fn failure(message: impl Into<String>, payload: Option<P>) -> Self {
        Self {
            error: true,
            message: message.into(),
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.error
    }
}

/// Contextual data attached to failure envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureContext {
    pub url: String,
}

/// Resolved or rejected envelope.
pub type Outcome<P> = Result<Envelope<P>, Envelope<FailureContext>>;

/// Success payload of `create`.
///
/// `image` is the value the page published, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedResource {
    pub title: String,
    pub url: String,
    pub description: String,
    pub image: String,
}

/// Paginated listing with the requested 1-indexed inclusive window.
///
/// `start`/`end` describe the request, not how many rows came back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcePage {
    pub start: u64,
    pub end: u64,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceList {
    pub resources: Vec<Resource>,
}

/// Number of resources a mutation touched. Zero still resolves as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Affected {
    pub affected: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceCount {
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotesCount {
    pub upvotes_count: u64,
    pub downvotes_count: u64,
}

#[cfg(test)]
mod tests {
    use super::{Envelope, FailureContext, VotesCount};
    use serde_json::json;

    #[test]
    fn success_envelope_serializes_payload() {
        let envelope = Envelope::success(
            "Votes count operation was successful",
            VotesCount {
                upvotes_count: 3,
                downvotes_count: 1,
            },
        );
        assert!(envelope.is_success());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "error": false,
                "message": "Votes count operation was successful",
                "payload": {"upvotesCount": 3, "downvotesCount": 1}
            })
        );
    }

    #[test]
    fn failure_envelope_omits_missing_payload() {
        let envelope: Envelope<FailureContext> = Envelope::failure("boom", None);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"error": true, "message": "boom"})
        );
    }
}
