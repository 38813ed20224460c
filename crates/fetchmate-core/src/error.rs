//! Typed errors for remote API interactions.
//!
//! `AuthExpired` is special: the HTTP wrapper handles it globally (session
//! clear + redirect guidance) before it ever reaches a workflow. Every other
//! kind is converted to a user-displayable string at the auth service or
//! fetch workflow boundary.

use thiserror::Error;

/// Errors produced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received at all.
    #[error("Network error")]
    Network(#[source] reqwest::Error),

    /// The server answered with a structured `{error}` body.
    #[error("{message}")]
    Validation {
        status: reqwest::StatusCode,
        message: String,
    },

    /// A 401 from any endpoint. By the time a caller sees this the session
    /// has already been cleared.
    #[error("Session expired. Log in again with `fetchmate login`.")]
    AuthExpired,

    /// The response body was missing expected fields.
    #[error("Unexpected response from server")]
    MalformedResponse(String),

    /// The response declared a content type no workflow knows how to handle.
    #[error("Unexpected response from server")]
    UnexpectedContentType(String),
}

impl ApiError {
    /// True when the global interceptor already forced a logout.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::AuthExpired)
    }
}
