//! Integration tests for presence endpoints and broadcasts.

mod helpers;

use std::time::Duration;

use axum::http::StatusCode;

#[tokio::test]
async fn test_update_and_get_presence() {
    let app = helpers::TestApp::new().await;

    let response = app.set_presence("alice", "online").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["presence"]["status"], "online");
    assert_eq!(response.body["data"]["previous_status"], "offline");
    assert_eq!(response.body["data"]["changed"], true);

    let response = app.request("GET", "/presence/alice", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user_id"], "alice");
    assert_eq!(response.body["data"]["status"], "online");
}

#[tokio::test]
async fn test_presence_validation_codes() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/presence",
            Some(serde_json::json!({ "status": "online" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "MISSING_USER_ID");

    let response = app
        .request("POST", "/presence", Some(serde_json::json!({ "user_id": "bob" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "MISSING_STATUS");

    let response = app.set_presence("bob", "sleeping").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_STATUS");

    let response = app.request("GET", "/presence?status=sleeping", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_STATUS");
}

#[tokio::test]
async fn test_unknown_user_presence() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/presence/ghost", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.request("DELETE", "/presence/ghost", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.request("GET", "/presence/ghost/history", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 0);
}

#[tokio::test]
async fn test_online_users_last_partial_page() {
    let app = helpers::TestApp::new().await;
    for i in 1..=7 {
        app.set_presence(&format!("user{i}"), "online").await;
    }
    app.set_presence("away1", "away").await;

    let response = app
        .request("GET", "/presence/online?limit=3&offset=6", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 7);
    assert_eq!(response.body["items"], serde_json::json!(["user7"]));

    let response = app
        .request("GET", "/presence/online?limit=3&offset=9", None)
        .await;
    assert_eq!(response.body["total"], 7);
    assert_eq!(response.body["items"], serde_json::json!([]));

    let response = app.request("GET", "/presence?status=away", None).await;
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["items"][0]["user_id"], "away1");
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let app = helpers::TestApp::new().await;
    app.set_presence("carol", "online").await;
    app.set_presence("carol", "away").await;
    app.set_presence("carol", "away").await;
    app.request("DELETE", "/presence/carol", None).await;

    let response = app.request("GET", "/presence/carol/history", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let items = response.body["items"].as_array().expect("items");
    let to: Vec<&str> = items
        .iter()
        .map(|t| t["to_status"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(to, ["offline", "away", "online"]);
}

#[tokio::test]
async fn test_status_change_is_broadcast_once() {
    let app = helpers::TestApp::new().await;
    let mut user_rx = app.subscribe("presence:dave");
    let mut online_rx = app.subscribe("presence:online_users");
    let mut all_rx = app.subscribe("presence*");

    app.set_presence("dave", "online").await;
    // Same status again: stored, but not broadcast.
    app.set_presence("dave", "online").await;
    // online -> away leaves the online set.
    app.set_presence("dave", "away").await;
    // away -> idle stays outside it.
    app.set_presence("dave", "idle").await;

    let wait = Duration::from_millis(200);
    let user_events = helpers::collect_events(&mut user_rx, wait).await;
    let online_events = helpers::collect_events(&mut online_rx, wait).await;
    let all_events = helpers::collect_events(&mut all_rx, wait).await;

    assert_eq!(user_events.len(), 3);
    assert_eq!(user_events[0].data["old_status"], "offline");
    assert_eq!(user_events[0].data["new_status"], "online");
    assert_eq!(online_events.len(), 2);
    // Per-user, global and the two online-set changes.
    assert_eq!(all_events.len(), 3 + 3 + 2);
}

#[tokio::test]
async fn test_evict_stale_validation_and_noop() {
    let app = helpers::TestApp::new().await;
    app.set_presence("erin", "online").await;

    let response = app
        .request(
            "POST",
            "/presence/evict-stale",
            Some(serde_json::json!({ "duration_minutes": 0 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_DURATION");

    let response = app
        .request(
            "POST",
            "/presence/evict-stale",
            Some(serde_json::json!({ "duration_minutes": 30 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["evicted"], 0);

    let response = app.request("GET", "/presence/erin", None).await;
    assert_eq!(response.body["data"]["status"], "online");
}

#[tokio::test]
async fn test_detailed_health_counts_presence() {
    let app = helpers::TestApp::new().await;
    app.set_presence("fay", "online").await;
    app.set_presence("gus", "away").await;

    let response = app.request("GET", "/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");

    let response = app.request("GET", "/health/detailed", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["presence"]["online"], 1);
    assert_eq!(response.body["data"]["presence"]["away"], 1);
    assert_eq!(response.body["data"]["presence"]["offline"], 0);
    assert!(response.body["data"]["event_bus"]["events_dispatched"].as_u64() >= Some(6));
}
