mod common;

use std::sync::Arc;

use common::{build_auth, HeldResponse, ADA_JSON};
use futures::future::join_all;
use mockito::{Server, ServerGuard};
use serde_json::Value;
use taskflow_client::auth::{Auth, GuardDecision, RefreshError, SessionStatus};
use taskflow_client::models::{TokenPair, UserProfile};
use taskflow_client::store::memory_store::MemoryStore;
use taskflow_client::store::{TokenKey, TokenStore};
use taskflow_client::utils::http_helpers::ApiError;

/// Signs in through bootstrap with an access token the server will later reject.
async fn signed_in(server: &mut ServerGuard, store: Arc<MemoryStore>) -> Arc<Auth> {
    server
        .mock("GET", "/auth/me")
        .match_header("authorization", "Bearer expired")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ADA_JSON)
        .expect(1)
        .create_async()
        .await;
    let auth = build_auth(&server.url(), store);
    assert_eq!(auth.bootstrap().await, SessionStatus::Authenticated);
    auth
}

#[tokio::test]
async fn test_expired_access_is_refreshed_and_replayed_once() {
    let mut server = Server::new_async().await;
    let store = Arc::new(MemoryStore::with_tokens(Some("expired"), Some("r1")));
    let auth = signed_in(&mut server, store.clone()).await;

    let rejected = server
        .mock("GET", "/projects")
        .match_header("authorization", "Bearer expired")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accessToken": "fresh", "refreshToken": "r2"}"#)
        .expect(1)
        .create_async()
        .await;
    let replayed = server
        .mock("GET", "/projects")
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let projects = auth.client().list_projects().await.unwrap();

    rejected.assert_async().await;
    refresh.assert_async().await;
    replayed.assert_async().await;
    assert!(projects.is_empty());
    assert_eq!(store.load(TokenKey::Access).await.unwrap().as_deref(), Some("fresh"));
    assert_eq!(store.load(TokenKey::Refresh).await.unwrap().as_deref(), Some("r2"));
    assert_eq!(auth.session().status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let mut server = Server::new_async().await;
    let auth = signed_in(
        &mut server,
        Arc::new(MemoryStore::with_tokens(Some("expired"), Some("r1"))),
    )
    .await;

    server
        .mock("GET", "/projects")
        .match_header("authorization", "Bearer expired")
        .with_status(401)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accessToken": "fresh"}"#)
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("GET", "/projects")
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(8)
        .create_async()
        .await;

    let client = auth.client();
    let results = join_all((0..8).map(|_| client.get_json::<Vec<Value>>("/projects"))).await;

    refresh.assert_async().await;
    accepted.assert_async().await;
    assert!(results.iter().all(Result::is_ok));
    assert!(!client.refresher().is_refreshing());
}

#[tokio::test]
async fn test_concurrent_401s_fail_together_when_refresh_is_rejected() {
    let mut server = Server::new_async().await;
    let auth = signed_in(
        &mut server,
        Arc::new(MemoryStore::with_tokens(Some("expired"), Some("revoked"))),
    )
    .await;

    server
        .mock("GET", "/projects")
        .with_status(401)
        .with_body(r#"{"message": "jwt expired"}"#)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(401)
        .with_body(r#"{"message": "Invalid refresh token"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = auth.client();
    let results = join_all((0..8).map(|_| client.get_json::<Vec<Value>>("/projects"))).await;

    refresh.assert_async().await;
    for result in results {
        let err = result.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { .. }), "{:?}", err);
        assert!(err.requires_login());
    }
    assert_eq!(auth.session().status(), SessionStatus::Anonymous);
}

#[tokio::test]
async fn test_invalid_refresh_redirects_to_login_preserving_path() {
    let mut server = Server::new_async().await;
    let store = Arc::new(MemoryStore::with_tokens(Some("expired"), Some("revoked")));
    let auth = signed_in(&mut server, store.clone()).await;

    server
        .mock("GET", "/projects/p1")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/refresh")
        .with_status(403)
        .create_async()
        .await;

    let err = auth.client().get_project("p1").await.unwrap_err();

    assert!(err.requires_login());
    assert_eq!(store.load(TokenKey::Access).await.unwrap(), None);
    assert_eq!(store.load(TokenKey::Refresh).await.unwrap(), None);
    assert_eq!(
        auth.check_route("/projects/p1"),
        GuardDecision::Redirect {
            to: "/login".to_string(),
            return_to: "/projects/p1".to_string(),
        }
    );
}

fn ada() -> UserProfile {
    UserProfile::new("u1", "ada@example.com", "Ada")
}

#[tokio::test]
async fn test_rejected_refresh_does_not_clear_a_newer_login() {
    let mut server = Server::new_async().await;
    let store = Arc::new(MemoryStore::with_tokens(Some("expired"), Some("r-old")));
    let auth = signed_in(&mut server, store.clone()).await;

    let (respond, mut held) = HeldResponse::new(r#"{"message": "Invalid refresh token"}"#);
    server
        .mock("POST", "/auth/refresh")
        .with_status(401)
        .with_body_from_request(respond)
        .expect(1)
        .create_async()
        .await;

    let (result, _) = tokio::join!(auth.client().refresher().refresh(), async {
        held.arrived().await;
        auth.session()
            .establish(TokenPair::new("new", Some("r-new".to_string())), ada())
            .await;
        held.release();
    });

    assert_eq!(result, Err(RefreshError::Superseded));
    assert_eq!(auth.session().status(), SessionStatus::Authenticated);
    assert_eq!(auth.session().access_token().as_deref(), Some("new"));
    assert_eq!(store.load(TokenKey::Access).await.unwrap().as_deref(), Some("new"));
    assert_eq!(store.load(TokenKey::Refresh).await.unwrap().as_deref(), Some("r-new"));
}

#[tokio::test]
async fn test_request_is_replayed_with_the_session_that_replaced_a_refresh() {
    let mut server = Server::new_async().await;
    let auth = signed_in(
        &mut server,
        Arc::new(MemoryStore::with_tokens(Some("expired"), Some("r-old"))),
    )
    .await;

    server
        .mock("GET", "/projects")
        .match_header("authorization", "Bearer expired")
        .with_status(401)
        .create_async()
        .await;
    let (respond, mut held) = HeldResponse::new(r#"{"message": "Invalid refresh token"}"#);
    server
        .mock("POST", "/auth/refresh")
        .with_status(401)
        .with_body_from_request(respond)
        .expect(1)
        .create_async()
        .await;
    let replayed = server
        .mock("GET", "/projects")
        .match_header("authorization", "Bearer new")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let (result, _) = tokio::join!(auth.client().list_projects(), async {
        held.arrived().await;
        auth.session()
            .establish(TokenPair::new("new", Some("r-new".to_string())), ada())
            .await;
        held.release();
    });

    replayed.assert_async().await;
    assert!(result.unwrap().is_empty());
    assert_eq!(auth.session().status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn test_token_changed_in_flight_replays_without_refresh() {
    let mut server = Server::new_async().await;
    let auth = signed_in(
        &mut server,
        Arc::new(MemoryStore::with_tokens(Some("expired"), Some("r1"))),
    )
    .await;

    let (respond, mut held) = HeldResponse::new("");
    let rejected = server
        .mock("GET", "/projects")
        .match_header("authorization", "Bearer expired")
        .with_status(401)
        .with_body_from_request(respond)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;
    let replayed = server
        .mock("GET", "/projects")
        .match_header("authorization", "Bearer a2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let (result, _) = tokio::join!(auth.client().list_projects(), async {
        held.arrived().await;
        auth.session()
            .establish(TokenPair::new("a2", Some("r2".to_string())), ada())
            .await;
        held.release();
    });

    rejected.assert_async().await;
    refresh.assert_async().await;
    replayed.assert_async().await;
    assert!(result.is_ok());
}
