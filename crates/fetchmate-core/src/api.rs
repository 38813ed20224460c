//! HTTP client wrapper for the FetchMate backend.
//!
//! Every request flows through [`ApiClient::execute`], which acts as the
//! client's declared interceptor pair: outgoing requests get the bearer
//! token when a session is present, and any 401 response — from any
//! endpoint — clears the persisted session before the error reaches the
//! caller. There is no token-refresh exchange; an expired access token
//! simply produces the 401 path on the next call.

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};

use crate::error::ApiError;
use crate::session::SessionStore;

/// Standard User-Agent header for FetchMate API requests.
pub const USER_AGENT: &str = concat!("fetchmate/", env!("CARGO_PKG_VERSION"));

/// Authenticated HTTP client for the remote API.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    store: Arc<SessionStore>,
}

impl ApiClient {
    /// Creates a client against `base_url`, sharing `store` for token
    /// attachment and 401 handling.
    ///
    /// # Panics
    /// In test builds, panics if `base_url` is the default development
    /// endpoint — unit tests must point at a mock server.
    pub fn new(base_url: impl Into<String>, store: Arc<SessionStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        #[cfg(test)]
        assert_ne!(
            base_url,
            crate::config::DEFAULT_BASE_URL,
            "Tests must not use a real API endpoint; use a wiremock server"
        );

        Self {
            base_url,
            http: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            store,
        }
    }

    /// The session store this client attaches tokens from.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Joins `path` onto the configured base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POSTs `body` as JSON to an API `path`.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Response, ApiError> {
        let url = self.endpoint(path);
        self.execute(self.request(Method::POST, &url).json(body))
            .await
    }

    /// GETs an absolute `url`. Format download links returned by the
    /// backend live outside the API base, but still carry the bearer token.
    pub async fn get_url(&self, url: &str) -> Result<Response, ApiError> {
        self.execute(self.request(Method::GET, url)).await
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(session) = self.store.current() {
            builder = builder.bearer_auth(&session.access);
        }
        builder
    }

    /// Sends the request and applies the global response interceptor.
    ///
    /// Applies to all requests: a 401 anywhere forces a full logout. Network
    /// errors and non-401 statuses pass through to the caller unmodified.
    async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(ApiError::Network)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("Received 401; clearing session");
            if let Err(e) = self.store.clear() {
                tracing::warn!("Failed to clear session after 401: {e:#}");
            }
            return Err(ApiError::AuthExpired);
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, UserRecord};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_with_session(dir: &std::path::Path) -> Arc<SessionStore> {
        let store = SessionStore::open_at(dir.join("session.json"));
        store
            .save(Session {
                user: UserRecord {
                    username: "dana".to_string(),
                    email: "dana@example.com".to_string(),
                    extra: serde_json::Map::new(),
                },
                access: "tok-123".to_string(),
                refresh: "ref-456".to_string(),
            })
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_bearer_token_attached_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ping"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), store_with_session(dir.path()));
        let response = client.post_json("/ping", &serde_json::json!({})).await.unwrap();
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn test_no_auth_header_without_session() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let store = Arc::new(SessionStore::open_at(dir.path().join("session.json")));
        let client = ApiClient::new(server.uri(), store);
        let response = client.post_json("/ping", &serde_json::json!({})).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
        assert!(response.status().is_success());
    }

    /// A 401 from any endpoint wipes the session, including the file.
    #[tokio::test]
    async fn test_401_clears_session_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/anything"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = store_with_session(dir.path());
        let session_file = store.path().to_path_buf();
        assert!(session_file.exists());

        let client = ApiClient::new(server.uri(), Arc::clone(&store));
        let err = client
            .post_json("/anything", &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(err.is_auth_expired());
        assert!(store.current().is_none());
        assert!(!session_file.exists());
    }

    /// Non-401 errors pass through unmodified for the caller to handle.
    #[tokio::test]
    async fn test_other_statuses_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/boom"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "URL is required"
            })))
            .mount(&server)
            .await;

        let store = store_with_session(dir.path());
        let client = ApiClient::new(server.uri(), Arc::clone(&store));
        let response = client.post_json("/boom", &serde_json::json!({})).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        // Session untouched by non-auth failures.
        assert!(store.current().is_some());
    }
}
