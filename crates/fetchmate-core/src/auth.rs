//! Signup, login, and logout against the remote users API.
//!
//! Successful signup/login synchronize the session store; failures of any
//! kind leave it untouched and surface a human-readable message, never a
//! raw error.

use anyhow::Result;
use serde::Deserialize;
use thiserror::Error;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::{Session, SessionStore, UserRecord};

pub const SIGNUP_PATH: &str = "/users/signup/";
pub const LOGIN_PATH: &str = "/users/login/";

/// A displayable authentication failure. Session state is guaranteed
/// unchanged when one of these is returned.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AuthError(pub String);

/// Success body shape shared by signup and login.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    user: UserRecord,
    tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Registers a new account and opens a session.
pub async fn signup(
    api: &ApiClient,
    username: &str,
    email: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let body = serde_json::json!({
        "username": username,
        "email": email,
        "password": password,
    });
    authenticate(api, SIGNUP_PATH, &body, "Signup failed").await
}

/// Authenticates an existing account and opens a session.
pub async fn login(api: &ApiClient, email: &str, password: &str) -> Result<Session, AuthError> {
    let body = serde_json::json!({
        "email": email,
        "password": password,
    });
    authenticate(api, LOGIN_PATH, &body, "Login failed").await
}

/// Ends the local session. Local-only: the backend is not called.
pub fn logout(store: &SessionStore) -> Result<()> {
    store.clear()
}

async fn authenticate(
    api: &ApiClient,
    path: &str,
    body: &serde_json::Value,
    fallback: &str,
) -> Result<Session, AuthError> {
    let response = match api.post_json(path, body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("{path} request failed: {e}");
            let message = match e {
                ApiError::AuthExpired => e.to_string(),
                _ => fallback.to_string(),
            };
            return Err(AuthError(message));
        }
    };

    if !response.status().is_success() {
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| fallback.to_string());
        return Err(AuthError(message));
    }

    // A body missing `user` or `tokens` fails to parse here and the session
    // stays as it was.
    let auth: AuthResponse = response
        .json()
        .await
        .map_err(|e| {
            tracing::debug!("{path} returned malformed body: {e}");
            AuthError(ApiError::MalformedResponse(e.to_string()).to_string())
        })?;

    let session = Session {
        user: auth.user,
        access: auth.tokens.access,
        refresh: auth.tokens.refresh,
    };

    api.store()
        .save(session.clone())
        .map_err(|e| AuthError(format!("Failed to persist session: {e:#}")))?;

    Ok(session)
}
