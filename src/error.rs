use serde::Serialize;
use thiserror::Error;

use crate::types::FixtureId;

/// Internal error taxonomy for lifecycle operations. Translated into
/// [`ActionResult`] at the service boundary; callers branch on `success`,
/// never on panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("wrong fixture kind: this operation requires an {expected} fixture")]
    WrongKind { expected: &'static str },

    #[error("fixture {fixture_id} already has the maximum of {limit} matches")]
    LimitReached { fixture_id: FixtureId, limit: usize },

    #[error("a partial mirror requires a playable side")]
    InvalidSide,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl OpError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        OpError::NotFound { entity, id }
    }

    /// Message safe to surface to callers. Storage details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            OpError::Storage(_) => "internal error, no changes were saved".to_string(),
            other => other.to_string(),
        }
    }
}

/// Boundary result shape for every lifecycle operation: either
/// `{ success: true, data, message? }` or `{ success: false, error }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        ActionResult {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        ActionResult {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn fail(err: &OpError) -> Self {
        ActionResult {
            success: false,
            data: None,
            message: None,
            error: Some(err.user_message()),
        }
    }
}
