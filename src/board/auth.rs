//! Explicit request credentials.
//!
//! There is no process-wide session: every storage call receives the caller's
//! [`Credential`] as an argument, and the board's [`AccessPolicy`] decides
//! what that credential may do.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::BoardError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// No `Authorization` header, or one we could not read.
    Anonymous,
    /// Opaque session token issued by the authentication provider.
    Bearer(String),
    /// Local administrative access from the command line.
    Operator,
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// Parse an `Authorization` header value. Anything other than a non-empty
    /// `Bearer <token>` is anonymous.
    pub fn from_authorization(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Anonymous;
        };
        let mut parts = value.trim().splitn(2, ' ');
        match (parts.next(), parts.next()) {
            (Some(scheme), Some(token))
                if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
            {
                Self::Bearer(token.trim().to_string())
            }
            _ => Self::Anonymous,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl<S> FromRequestParts<S> for Credential
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        Ok(Self::from_authorization(value))
    }
}

/// What each kind of credential may do. Reads are always allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub allow_anonymous_writes: bool,
}

impl AccessPolicy {
    /// Reads are public. The credential still flows through so every storage
    /// call names its caller.
    pub fn authorize_read(&self, credential: &Credential, action: &'static str) -> Result<(), BoardError> {
        trace!(anonymous = credential.is_anonymous(), action, "Read access");
        Ok(())
    }

    pub fn authorize_write(&self, credential: &Credential, action: &'static str) -> Result<(), BoardError> {
        match credential {
            Credential::Anonymous if !self.allow_anonymous_writes => {
                Err(BoardError::Unauthorized { action })
            }
            _ => Ok(()),
        }
    }

    /// Bulk operations are reserved to the local operator.
    pub fn authorize_admin(&self, credential: &Credential, action: &'static str) -> Result<(), BoardError> {
        match credential {
            Credential::Operator => Ok(()),
            _ => Err(BoardError::Unauthorized { action }),
        }
    }
}
