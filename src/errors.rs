//! Typed error hierarchy for civic-hero.
//!
//! Two top-level enums cover the two fallible boundaries:
//! - `BoardError`: issue/comment storage and access control
//! - `EstimateError`: the external estimation service
//!
//! The ranking core (`crate::rank`) is total and has no error type.

use thiserror::Error;

/// Errors from the issue board (storage + access policy).
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Issue {id} not found")]
    IssueNotFound { id: i64 },

    #[error("Comment {id} not found")]
    CommentNotFound { id: i64 },

    #[error("A session token is required for {action}")]
    Unauthorized { action: &'static str },

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl BoardError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Errors from the estimation service.
///
/// Configuration, schema and transport failures stay distinct so the API can
/// surface each with its own payload.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("OpenAI API key is not configured")]
    MissingCredential,

    #[error("Generated analysis did not match the expected schema: {cause}")]
    Schema {
        generated_text: String,
        cause: String,
    },

    #[error("Estimation request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for EstimateError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
