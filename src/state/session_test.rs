use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::net::client::REFRESH_PATH;
use crate::net::transport::test_helpers::{MockTransport, bearer, client_with, json_response};
use crate::state::token::TokenStore;

const PROFILE: &str = "/api/profile/";

fn marie() -> serde_json::Value {
    json!({ "id": 1, "username": "marie", "email": "marie@example.fr", "is_email_verified": true })
}

fn session_over(transport: Arc<MockTransport>, token: Option<&str>) -> (Session, Arc<crate::state::token::MemoryTokenStore>) {
    let (client, store) = client_with(transport, token);
    (Session::new(Arc::new(client)), store)
}

// =============================================================================
// bootstrap
// =============================================================================

#[tokio::test]
async fn starts_loading_and_signed_out() {
    let transport = MockTransport::new(|_| json_response(200, &marie()));
    let (session, _) = session_over(transport, None);

    let state = session.state();
    assert!(state.loading);
    assert!(!state.is_authenticated());
}

#[tokio::test]
async fn bootstrap_without_token_makes_no_call() {
    let transport = MockTransport::new(|_| json_response(200, &marie()));
    let (session, _) = session_over(transport.clone(), None);

    assert_eq!(session.bootstrap().await, None);
    assert!(transport.requests().is_empty());
    assert_eq!(session.state(), AuthState { user: None, loading: false });
}

#[tokio::test]
async fn bootstrap_with_valid_token_loads_profile() {
    let transport = MockTransport::new(|_| json_response(200, &marie()));
    let (session, _) = session_over(transport.clone(), Some("jwt"));

    let user = session.bootstrap().await.unwrap();
    assert_eq!(user.username, "marie");
    assert!(session.is_authenticated());
    assert!(!session.state().loading);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn bootstrap_refreshes_once_then_refetches() {
    let transport = MockTransport::new(|req| {
        if req.url.ends_with(REFRESH_PATH) {
            return json_response(200, &json!({ "access": "fresh" }));
        }
        match bearer(req) {
            Some("fresh") => json_response(200, &marie()),
            _ => json_response(401, &json!({ "detail": "expired" })),
        }
    });
    let (session, store) = session_over(transport.clone(), Some("stale"));

    assert!(session.bootstrap().await.is_some());
    assert_eq!(transport.count(PROFILE), 2);
    assert_eq!(transport.count(REFRESH_PATH), 1);
    assert_eq!(store.load().unwrap().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn bootstrap_gives_up_after_chain() {
    let transport = MockTransport::new(|req| {
        if req.url.ends_with(REFRESH_PATH) {
            return json_response(200, &json!({ "access": "fresh" }));
        }
        json_response(401, &json!({ "detail": "still no" }))
    });
    let (session, _) = session_over(transport.clone(), Some("stale"));

    assert_eq!(session.bootstrap().await, None);
    assert_eq!(transport.count(PROFILE), 2);
    assert_eq!(transport.count(REFRESH_PATH), 1);
    assert_eq!(session.state(), AuthState { user: None, loading: false });
}

#[tokio::test]
async fn bootstrap_refresh_failure_signs_out_and_clears_token() {
    let transport = MockTransport::new(|_| json_response(401, &json!({ "detail": "nope" })));
    let (session, store) = session_over(transport.clone(), Some("stale"));

    assert_eq!(session.bootstrap().await, None);
    assert_eq!(transport.count(PROFILE), 1);
    assert_eq!(transport.count(REFRESH_PATH), 1);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn bootstrap_network_failure_still_tries_refresh() {
    let transport = MockTransport::new(|_| Err(ApiError::Network("offline".into())));
    let (session, _) = session_over(transport.clone(), Some("jwt"));

    assert_eq!(session.bootstrap().await, None);
    assert_eq!(transport.count(REFRESH_PATH), 1);
    assert!(!session.state().loading);
}

// =============================================================================
// login / logout / refresh
// =============================================================================

#[tokio::test]
async fn login_publishes_user_to_subscribers() {
    let transport = MockTransport::new(|req| {
        if req.url.ends_with("/api/token/") {
            json_response(200, &json!({ "access": "jwt" }))
        } else {
            json_response(200, &marie())
        }
    });
    let (session, _) = session_over(transport.clone(), None);
    let mut rx = session.subscribe();

    let user = session.login("marie", "pw").await.unwrap();
    assert_eq!(user.id, 1);
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_authenticated());
    assert_eq!(bearer(&transport.requests()[1]), Some("jwt"));
}

#[tokio::test]
async fn failed_login_leaves_user_unset() {
    let transport = MockTransport::new(|_| json_response(401, &json!({ "detail": "No active account" })));
    let (session, _) = session_over(transport, None);

    assert!(session.login("marie", "bad").await.is_err());
    assert_eq!(session.user(), None);
}

#[tokio::test]
async fn logout_resets_user_even_on_failure() {
    let transport = MockTransport::new(|req| {
        if req.url.ends_with("/api/logout/") {
            Err(ApiError::Network("offline".into()))
        } else {
            json_response(200, &marie())
        }
    });
    let (session, store) = session_over(transport, Some("jwt"));
    session.bootstrap().await;
    assert!(session.is_authenticated());

    assert!(session.logout().await.is_err());
    assert!(!session.is_authenticated());
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn refresh_reloads_profile() {
    let transport = MockTransport::new(|req| {
        if req.url.ends_with(REFRESH_PATH) {
            json_response(200, &json!({ "access": "fresh" }))
        } else {
            json_response(200, &marie())
        }
    });
    let (session, _) = session_over(transport, None);

    assert!(session.refresh().await);
    assert_eq!(session.user().map(|u| u.username), Some("marie".to_owned()));
}

#[tokio::test]
async fn refresh_failure_keeps_user() {
    let transport = MockTransport::new(|req| {
        if req.url.ends_with(REFRESH_PATH) {
            json_response(401, &json!({ "detail": "expired" }))
        } else {
            json_response(200, &marie())
        }
    });
    let (session, _) = session_over(transport, Some("jwt"));
    session.bootstrap().await;

    assert!(!session.refresh().await);
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn refresh_with_failing_profile_clears_user() {
    let transport = MockTransport::new(|req| {
        if req.url.ends_with(REFRESH_PATH) {
            json_response(200, &json!({ "access": "fresh" }))
        } else if bearer(req) == Some("jwt") {
            json_response(200, &marie())
        } else {
            json_response(500, &json!({ "detail": "down" }))
        }
    });
    let (session, _) = session_over(transport, Some("jwt"));
    session.bootstrap().await;
    assert!(session.is_authenticated());

    assert!(!session.refresh().await);
    assert!(!session.is_authenticated());
}
