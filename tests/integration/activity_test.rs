//! Integration tests for activity logging, feeds and broadcast policy.

mod helpers;

use std::time::Duration;

use axum::http::StatusCode;

async fn log(
    app: &helpers::TestApp,
    user: &str,
    action: &str,
    resource: Option<(&str, &str)>,
) -> helpers::TestResponse {
    let mut body = serde_json::json!({ "user_id": user, "action": action });
    if let Some((resource_type, resource_id)) = resource {
        body["resource_type"] = resource_type.into();
        body["resource_id"] = resource_id.into();
    }
    app.request("POST", "/activity", Some(body)).await
}

#[tokio::test]
async fn test_log_and_query_feeds() {
    let app = helpers::TestApp::new().await;

    let response = log(&app, "alice", "file_uploaded", Some(("project", "p1"))).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["user_id"], "alice");
    log(&app, "alice", "comment_added", None).await;
    log(&app, "bob", "file_uploaded", Some(("project", "p1"))).await;

    let response = app.request("GET", "/activity/user/alice", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 2);
    assert_eq!(response.body["items"][0]["action"], "comment_added");

    let response = app
        .request("GET", "/activity/resource/project/p1", None)
        .await;
    assert_eq!(response.body["total"], 2);
    assert_eq!(response.body["items"][0]["user_id"], "bob");

    let response = app.request("GET", "/activity/recent?limit=1", None).await;
    assert_eq!(response.body["total"], 3);
    assert_eq!(response.body["items"].as_array().map(Vec::len), Some(1));

    let response = app.request("GET", "/activity/stats/alice", None).await;
    assert_eq!(response.body["data"]["total"], 2);
    assert_eq!(response.body["data"]["by_action"]["file_uploaded"], 1);
    assert_eq!(response.body["data"]["by_resource_type"]["project"], 1);
}

#[tokio::test]
async fn test_activity_validation_codes() {
    let app = helpers::TestApp::new().await;

    let response = log(&app, "", "file_uploaded", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "MISSING_USER_ID");

    let response = log(&app, "alice", "  ", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "MISSING_ACTION");
}

#[tokio::test]
async fn test_delete_activity() {
    let app = helpers::TestApp::new().await;
    let response = log(&app, "carol", "task_completed", None).await;
    let id = response.body["data"]["id"].as_str().expect("id").to_string();

    let response = app.request("DELETE", &format!("/activity/{id}"), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.request("DELETE", &format!("/activity/{id}"), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.request("DELETE", "/activity/nope", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_ACTIVITY_ID");

    let response = app.request("GET", "/activity/user/carol", None).await;
    assert_eq!(response.body["total"], 0);
}

#[tokio::test]
async fn test_suppressed_actions_are_stored_but_not_broadcast() {
    let app = helpers::TestApp::new().await;
    let mut rx = app.subscribe("*");

    let response = log(&app, "dave", "view_stats", None).await;
    assert_eq!(response.status, StatusCode::CREATED);

    let events = helpers::collect_events(&mut rx, Duration::from_millis(200)).await;
    assert!(events.is_empty(), "unexpected events: {events:?}");

    let response = app.request("GET", "/activity/user/dave", None).await;
    assert_eq!(response.body["total"], 1);
}

#[tokio::test]
async fn test_channel_fan_out() {
    let app = helpers::TestApp::new().await;
    let mut rx = app.subscribe("*");

    // User and resource channels.
    log(&app, "erin", "file_uploaded", Some(("project", "p7"))).await;
    // Significant: user and global channels.
    log(&app, "erin", "deployment_complete", None).await;

    let events = helpers::collect_events(&mut rx, Duration::from_millis(200)).await;
    let channels: Vec<&str> = events.iter().map(|e| e.channel.as_str()).collect();
    assert_eq!(
        channels,
        ["activity:erin", "activity:resource:project:p7", "activity:erin", ""]
    );
}
