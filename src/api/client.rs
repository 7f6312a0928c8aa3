//! The authenticated request wrapper every API call goes through.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::refresh::{RefreshCoordinator, RefreshError};
use crate::auth::session::SessionContext;
use crate::config::ApiConfig;
use crate::store::TokenKey;
use crate::utils::http_helpers::{decode_response, error_from_response, transport_error, ApiError};

/// Where a request is in its authorization cycle. A `Retried` request is
/// never refreshed again, which bounds every call to two sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Fresh,
    Retried,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    session: SessionContext,
    refresher: RefreshCoordinator,
}

/// HTTP client for the TaskFlow API. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Builds the client; the configured timeout applies to every request,
    /// token refresh included.
    pub fn new(config: &ApiConfig, session: SessionContext) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Self::with_http(http, &config.base_url, session))
    }

    pub fn with_http(http: reqwest::Client, base_url: &str, session: SessionContext) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let refresher = RefreshCoordinator::new(http.clone(), &base_url, session.clone());
        ApiClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                session,
                refresher,
            }),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.inner.session
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.inner.refresher
    }

    /// Absolute URL for an endpoint path such as `/projects`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Sends an authenticated request.
    ///
    /// Persisted tokens are loaded first, so requests made before bootstrap
    /// still carry the stored bearer token.
    ///
    /// `build` is called once per send so the request can be replayed after a
    /// token refresh. A 401 on the first send triggers one refresh and one
    /// replay; if the refresh fails, or the replay is still rejected, the
    /// session is cleared and `ApiError::Unauthorized` is returned. When a
    /// login replaced the session during the refresh, the request is replayed
    /// with the new token instead.
    /// Any other response, successful or not, is returned as is.
    pub async fn send<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&reqwest::Client) -> Result<RequestBuilder, ApiError>,
    {
        self.session().ensure_loaded().await;
        let mut attempt = Attempt::Fresh;
        loop {
            let token = self.session().access_token();
            let response = self.send_with_token(&build, token.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }
            let original = error_from_response(response).await;

            match attempt {
                Attempt::Retried => {
                    if self
                        .session()
                        .clear_if_current(TokenKey::Access, token.as_deref())
                        .await
                    {
                        warn!("Request still unauthorized after token refresh; session cleared");
                    }
                    return Err(original);
                }
                Attempt::Fresh => {
                    attempt = Attempt::Retried;
                    let current = self.session().access_token();
                    if current.is_some() && current != token {
                        debug!("Access token changed while the request was in flight; replaying");
                        continue;
                    }
                    match self.refresher().refresh().await {
                        Ok(_) => {}
                        Err(RefreshError::Superseded) if self.session().access_token().is_some() => {
                            debug!("Session replaced during refresh; replaying with its token");
                        }
                        Err(e) => {
                            debug!("Not replaying request, refresh failed: {}", e);
                            return Err(original);
                        }
                    }
                }
            }
        }
    }

    /// Sends once with the current bearer token; a 401 is returned as a
    /// response and does not trigger a refresh.
    pub async fn send_once<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&reqwest::Client) -> Result<RequestBuilder, ApiError>,
    {
        self.session().ensure_loaded().await;
        let token = self.session().access_token();
        self.send_with_token(&build, token.as_deref()).await
    }

    /// Sends without credentials and without refresh handling (login, register).
    pub async fn send_public<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&reqwest::Client) -> Result<RequestBuilder, ApiError>,
    {
        self.send_with_token(&build, None).await
    }

    async fn send_with_token<F>(&self, build: &F, token: Option<&str>) -> Result<Response, ApiError>
    where
        F: Fn(&reqwest::Client) -> Result<RequestBuilder, ApiError>,
    {
        let mut request = build(&self.inner.http)?;
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.map_err(transport_error)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        decode_response(self.send(|http| Ok(http.get(&url))).await?).await
    }

    pub async fn get_json_with_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        decode_response(self.send(|http| Ok(http.get(&url).query(query))).await?).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        decode_response(self.send(|http| Ok(http.post(&url).json(body))).await?).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        decode_response(self.send(|http| Ok(http.put(&url).json(body))).await?).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        decode_response(self.send(|http| Ok(http.delete(&url))).await?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::SessionStatus;
    use crate::models::{TokenPair, UserProfile};
    use crate::store::memory_store::MemoryStore;
    use mockito::{Matcher, Server};
    use serde_json::Value;

    async fn client_for(server: &Server, access: &str, refresh: Option<&str>) -> ApiClient {
        let session = SessionContext::new(Arc::new(MemoryStore::new()));
        session
            .establish(
                TokenPair::new(access, refresh.map(str::to_string)),
                UserProfile::new("u1", "ada@example.com", "Ada"),
            )
            .await;
        ApiClient::with_http(reqwest::Client::new(), &server.url(), session)
    }

    #[tokio::test]
    async fn test_bearer_token_is_attached() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/projects")
            .match_header("authorization", "Bearer a1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = client_for(&server, "a1", None).await;
        let body: Vec<Value> = client.get_json("/projects").await.unwrap();

        m.assert_async().await;
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_second_401_after_refresh_is_not_retried_again() {
        let mut server = Server::new_async().await;
        let rejected = server
            .mock("GET", "/projects")
            .with_status(401)
            .with_body(r#"{"message": "Token revoked"}"#)
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"accessToken": "a2"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, "a1", Some("r1")).await;
        let err = client.get_json::<Value>("/projects").await.unwrap_err();

        rejected.assert_async().await;
        refresh.assert_async().await;
        assert!(err.requires_login());
        assert_eq!(err.to_string(), "Token revoked");
        assert_eq!(client.session().status(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_non_auth_errors_leave_session_alone() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/projects")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"errors": {"name": ["is required"]}}"#)
            .create_async()
            .await;

        let client = client_for(&server, "a1", Some("r1")).await;
        let err = client
            .post_json::<_, Value>("/projects", &serde_json::json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "name: is required");
        assert_eq!(client.session().status(), SessionStatus::Authenticated);
        assert_eq!(client.session().access_token().as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_query_parameters_are_sent() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/jobs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("status".into(), "failed".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server, "a1", None).await;
        let _: Value = client
            .get_json_with_query("/jobs", &[("page", "2"), ("status", "failed")])
            .await
            .unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_network_error() {
        let session = SessionContext::new(Arc::new(MemoryStore::new()));
        // Port 9 (discard) on localhost is not expected to accept connections.
        let client = ApiClient::with_http(reqwest::Client::new(), "http://127.0.0.1:9", session);

        let err = client.get_json::<Value>("/projects").await.unwrap_err();

        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(
            err.to_string(),
            "No response from server. Please check your connection."
        );
        assert_eq!(client.session().status(), SessionStatus::Unresolved);
    }
}
