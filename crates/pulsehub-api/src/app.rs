//! Application builder: wires router, middleware and state into an Axum
//! app, and runs the server with its background tasks.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use chrono::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use pulsehub_core::config::AppConfig;
use pulsehub_core::error::AppError;
use pulsehub_core::result::AppResult;
use pulsehub_worker::jobs::{PresenceEvictionHandler, RiskScanHandler, SessionCleanupHandler};
use pulsehub_worker::{CronScheduler, JobExecutor};

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let cors = build_cors_layer(&state.config.server.cors);

    build_router(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_logging))
}

/// Registers the maintenance job handlers against the state's trackers.
pub fn build_executor(state: &AppState) -> JobExecutor {
    let stale_after = Duration::minutes(state.config.presence.stale_after_minutes as i64);

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(PresenceEvictionHandler::new(
        Arc::clone(&state.presence),
        stale_after,
    )));
    executor.register(Arc::new(SessionCleanupHandler::new(Arc::clone(
        &state.sessions,
    ))));
    executor.register(Arc::new(RiskScanHandler::new(Arc::clone(&state.sessions))));
    executor
}

/// Runs the PulseHub server until SIGINT/SIGTERM.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting PulseHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Trackers and event bus ───────────────────────────
    let state = AppState::from_config(config)?;
    let config = Arc::clone(&state.config);

    // ── Step 2: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 3: Start event delivery ─────────────────────────────
    let bus_handle = state.event_bus.start(shutdown_rx)?;
    tracing::info!(
        queue_capacity = config.event_bus.queue_capacity,
        "Event bus started"
    );

    // ── Step 4: Start background scheduler ───────────────────────
    let mut scheduler = if config.worker.enabled {
        tracing::info!("Starting background scheduler...");
        let mut scheduler = CronScheduler::new(Arc::new(build_executor(&state))).await?;
        scheduler.register_default_tasks(&config).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Background scheduler disabled");
        None
    };

    // ── Step 5: Build and start HTTP server ──────────────────────
    let app = build_app(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(address = %addr, "PulseHub server listening");

    // ── Step 6: Graceful shutdown ────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 7: Stop jobs, then drain the bus ────────────────────
    let grace = StdDuration::from_secs(config.server.shutdown_grace_seconds);
    shutdown_background(scheduler.as_mut(), &shutdown_tx, bus_handle, grace).await;

    tracing::info!("PulseHub server shut down gracefully");
    Ok(())
}

/// Stops the scheduler, then signals the event bus and waits up to `grace`
/// for it to drain.
pub async fn shutdown_background(
    scheduler: Option<&mut CronScheduler>,
    shutdown_tx: &watch::Sender<bool>,
    bus_handle: JoinHandle<()>,
    grace: StdDuration,
) {
    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
        }
    }
    let _ = shutdown_tx.send(true);

    if tokio::time::timeout(grace, bus_handle).await.is_err() {
        tracing::warn!(
            grace_seconds = grace.as_secs(),
            "Event bus did not drain before the grace period elapsed"
        );
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
