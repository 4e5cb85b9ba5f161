//! Integration tests for session lifecycle, limits and aggregate views.

mod helpers;

use std::time::Duration;

use axum::http::StatusCode;
use pulsehub_core::config::AppConfig;
use pulsehub_core::config::session::{OverflowStrategy, SessionLimitsConfig};

fn limited(max_per_user: u32, overflow_strategy: OverflowStrategy) -> AppConfig {
    let mut config = AppConfig::default();
    config.session.limits = SessionLimitsConfig {
        max_per_user,
        overflow_strategy,
    };
    config
}

#[tokio::test]
async fn test_create_returns_token_once() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/sessions",
            Some(serde_json::json!({
                "user_id": "alice",
                "ip_address": "203.0.113.7",
                "user_agent": "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["state"], "active");
    assert!(response.body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));

    let id = response.body["data"]["id"].as_str().expect("id");
    let response = app.request("GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user_id"], "alice");
    assert!(response.body["data"].get("token").is_none());
}

#[tokio::test]
async fn test_create_validation_codes() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/sessions",
            Some(serde_json::json!({ "ip_address": "203.0.113.7" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "MISSING_USER_ID");

    let response = app
        .request(
            "POST",
            "/sessions",
            Some(serde_json::json!({ "user_id": "alice", "ip_address": "not-an-ip" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_IP_ADDRESS");
}

#[tokio::test]
async fn test_bad_session_ids() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/sessions/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_SESSION_ID");

    let response = app
        .request(
            "GET",
            "/sessions/0190a1b2-0000-7000-8000-000000000000",
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lock_unlock_and_validate() {
    let app = helpers::TestApp::new().await;
    let id = app.create_session("bob", "198.51.100.4").await;

    let response = app.request("POST", &format!("/sessions/{id}/lock"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["state"], "locked");

    let response = app
        .request("GET", &format!("/sessions/{id}/validate"), None)
        .await;
    assert_eq!(response.body["data"]["valid"], false);

    let response = app
        .request(
            "POST",
            &format!("/sessions/{id}/activity"),
            Some(serde_json::json!({ "action": "open_project" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "SESSION_LOCKED");

    let response = app
        .request("POST", &format!("/sessions/{id}/unlock"), None)
        .await;
    assert_eq!(response.body["data"]["state"], "active");

    let response = app
        .request("GET", &format!("/sessions/{id}/validate"), None)
        .await;
    assert_eq!(response.body["data"]["valid"], true);
}

#[tokio::test]
async fn test_kicked_session_stays_dead() {
    let app = helpers::TestApp::new().await;
    let id = app.create_session("carol", "198.51.100.5").await;

    let response = app.request("POST", &format!("/sessions/{id}/kick"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["state"], "destroyed");

    // Kicking again is a no-op.
    let response = app.request("POST", &format!("/sessions/{id}/kick"), None).await;
    assert_eq!(response.status, StatusCode::OK);

    for path in ["extend", "lock", "unlock"] {
        let response = app
            .request("POST", &format!("/sessions/{id}/{path}"), None)
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(response.error_code(), "SESSION_NOT_ACTIVE", "{path}");
    }

    let response = app
        .request("GET", "/sessions/user/carol/online", None)
        .await;
    assert_eq!(response.body["data"]["online"], false);
}

#[tokio::test]
async fn test_extend_body_is_optional() {
    let app = helpers::TestApp::new().await;
    let id = app.create_session("dave", "198.51.100.6").await;

    let response = app
        .request("POST", &format!("/sessions/{id}/extend"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request(
            "POST",
            &format!("/sessions/{id}/extend"),
            Some(serde_json::json!({ "duration_seconds": 0 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_DURATION");
}

#[tokio::test]
async fn test_session_activity_trail() {
    let app = helpers::TestApp::new().await;
    let id = app.create_session("erin", "198.51.100.7").await;

    for action in ["open_project", "edit_file", "save_file"] {
        let response = app
            .request(
                "POST",
                &format!("/sessions/{id}/activity"),
                Some(serde_json::json!({ "action": action })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = app
        .request("GET", &format!("/sessions/{id}/activity?limit=2"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 3);
    assert_eq!(response.body["items"][0]["action"], "save_file");
    assert_eq!(response.body["items"][1]["action"], "edit_file");
}

#[tokio::test]
async fn test_limit_deny_returns_conflict() {
    let app = helpers::TestApp::with_config(limited(1, OverflowStrategy::Deny)).await;
    app.create_session("frank", "198.51.100.8").await;

    let response = app
        .request(
            "POST",
            "/sessions",
            Some(serde_json::json!({ "user_id": "frank", "ip_address": "198.51.100.8" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error_code(), "SESSION_LIMIT_REACHED");
}

#[tokio::test]
async fn test_limit_kick_oldest() {
    let app = helpers::TestApp::with_config(limited(1, OverflowStrategy::KickOldest)).await;
    let first = app.create_session("gina", "198.51.100.9").await;
    let second = app.create_session("gina", "198.51.100.9").await;

    let response = app
        .request("GET", &format!("/sessions/{first}/validate"), None)
        .await;
    assert_eq!(response.body["data"]["valid"], false);
    let response = app
        .request("GET", &format!("/sessions/{second}/validate"), None)
        .await;
    assert_eq!(response.body["data"]["valid"], true);
}

#[tokio::test]
async fn test_kick_user_and_online_views() {
    let app = helpers::TestApp::new().await;
    app.create_session("hank", "198.51.100.10").await;
    app.create_session("hank", "198.51.100.11").await;
    app.create_session("iris", "198.51.100.12").await;

    let response = app.request("GET", "/sessions/online-users", None).await;
    assert_eq!(response.body["data"]["users"], serde_json::json!(["hank", "iris"]));
    assert_eq!(response.body["data"]["count"], 2);

    let response = app
        .request("GET", "/sessions/concurrent-users", None)
        .await;
    assert_eq!(response.body["data"]["concurrent_users"], 2);
    assert_eq!(response.body["data"]["active_sessions"], 3);

    let response = app
        .request("POST", "/sessions/user/hank/kick", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["kicked"], 2);

    let response = app.request("GET", "/sessions/user/hank/online", None).await;
    assert_eq!(response.body["data"]["online"], false);

    let response = app.request("GET", "/sessions/active", None).await;
    assert_eq!(response.body["total"], 1);

    let response = app.request("GET", "/sessions/stats", None).await;
    assert_eq!(response.body["data"]["total"], 3);
    assert_eq!(response.body["data"]["destroyed"], 2);
}

#[tokio::test]
async fn test_ip_churn_is_flagged() {
    let app = helpers::TestApp::new().await;
    let id = app.create_session("jack", "198.51.100.13").await;

    for (ip, agent) in [
        ("198.51.100.14", "curl/8.4.0"),
        ("198.51.100.15", "python-requests/2.31"),
    ] {
        app.request(
            "POST",
            &format!("/sessions/{id}/activity"),
            Some(serde_json::json!({
                "action": "download",
                "ip_address": ip,
                "user_agent": agent,
            })),
        )
        .await;
    }

    let response = app
        .request("GET", "/sessions/suspicious-activity", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let flagged = response.body["data"].as_array().expect("array");
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0]["session_id"], id.as_str());

    let response = app.request("GET", "/sessions/risky", None).await;
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["items"][0]["flagged"], true);
}

#[tokio::test]
async fn test_lifecycle_events_on_user_channel() {
    let app = helpers::TestApp::new().await;
    let mut rx = app.subscribe("session:kate");

    let id = app.create_session("kate", "198.51.100.16").await;
    app.request("POST", &format!("/sessions/{id}/lock"), None).await;
    app.request("POST", &format!("/sessions/{id}/unlock"), None).await;
    app.request("DELETE", &format!("/sessions/{id}"), None).await;

    let events = helpers::collect_events(&mut rx, Duration::from_millis(200)).await;
    let kinds: Vec<String> = events.iter().map(|e| e.kind.to_string()).collect();
    assert_eq!(
        kinds,
        [
            "session_created",
            "session_locked",
            "session_unlocked",
            "session_destroyed"
        ]
    );
}

#[tokio::test]
async fn test_current_session_and_destroy_all() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/sessions/current/jane", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code(), "NOT_FOUND");

    app.create_session("jane", "198.51.100.20").await;
    let newest = app.create_session("jane", "198.51.100.21").await;
    let other = app.create_session("kim", "198.51.100.22").await;

    let response = app.request("GET", "/sessions/current/jane", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["id"], newest.as_str());
    assert!(response.body["data"].get("token").is_none());

    let response = app
        .request("DELETE", "/sessions/user/jane/all", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user_id"], "jane");
    assert_eq!(response.body["data"]["kicked"], 2);

    let response = app.request("GET", &format!("/sessions/{newest}"), None).await;
    assert_eq!(response.body["data"]["state"], "destroyed");
    assert_eq!(response.body["data"]["destroyed_reason"], "destroyed");

    let response = app.request("GET", "/sessions/current/jane", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request("DELETE", "/sessions/user/jane/all", None)
        .await;
    assert_eq!(response.body["data"]["kicked"], 0);

    let response = app.request("GET", &format!("/sessions/{other}/validate"), None).await;
    assert_eq!(response.body["data"]["valid"], true);
}
