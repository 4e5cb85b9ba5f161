//! Shared test helpers for integration tests.
//!
//! Builds the full application in-process (no listener) and drives it with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tower::ServiceExt;

use pulsehub_api::{AppState, build_app};
use pulsehub_core::config::AppConfig;
use pulsehub_core::events::Event;
use pulsehub_realtime::ChannelListener;

/// Test application context
pub struct TestApp {
    /// The router under test
    pub router: Router,
    /// Shared state, for poking trackers and the bus directly
    pub state: AppState,
    /// Stops the event bus when dropped
    _shutdown: watch::Sender<bool>,
}

impl TestApp {
    /// Create a test application with default configuration
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    /// Create a test application with a custom configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let state = AppState::from_config(config).expect("Failed to build state");
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        state
            .event_bus
            .start(shutdown_rx)
            .expect("Failed to start event bus");

        let router = build_app(state.clone());

        Self {
            router,
            state,
            _shutdown: shutdown_tx,
        }
    }

    /// Subscribe a buffered listener on `channel` (patterns allowed)
    pub fn subscribe(&self, channel: &str) -> mpsc::Receiver<Event> {
        let (listener, rx) = ChannelListener::new(format!("test:{channel}"), 256);
        self.state.event_bus.subscribe(channel, Arc::new(listener));
        rx
    }

    /// Make an HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Create a session and return its ID
    pub async fn create_session(&self, user_id: &str, ip: &str) -> String {
        let response = self
            .request(
                "POST",
                "/sessions",
                Some(serde_json::json!({
                    "user_id": user_id,
                    "ip_address": ip,
                    "user_agent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0",
                    "location": "Lisbon",
                })),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "Session create failed: {:?}",
            response.body
        );
        response.body["data"]["id"]
            .as_str()
            .expect("No id in session response")
            .to_string()
    }

    /// Set a user's presence status
    pub async fn set_presence(&self, user_id: &str, status: &str) -> TestResponse {
        self.request(
            "POST",
            "/presence",
            Some(serde_json::json!({ "user_id": user_id, "status": status })),
        )
        .await
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `error` code of an error body
    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// Drain everything the listener has received within `wait`
pub async fn collect_events(rx: &mut mpsc::Receiver<Event>, wait: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(wait, rx.recv()).await {
        events.push(event);
    }
    events
}
