use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::StatusCode;
use tokio::sync::{mpsc, watch};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState};
use crate::config::{PlannerConfig, ServerConfig};
use crate::navigation::tracker::run_tracker;
use crate::navigation::{LocationTracker, NavigationStateMachine, TrackerSnapshot};
use crate::planner::TripPlanner;

pub fn app(state: AppState, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new().nest("/api", api::router(state)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(server.request_timeout_seconds.into()),
            ))
            .layer(cors),
    )
}

/// Wire the planner, session and tracker, then serve until ctrl-c
pub async fn run(config: PlannerConfig) -> Result<()> {
    let planner = Arc::new(TripPlanner::from_config(&config)?);
    let machine = NavigationStateMachine::new(config.fuel.vehicle.clone());

    let (events_tx, events_rx) = mpsc::channel(config.tracking.channel_capacity);
    let (snapshots_tx, snapshots_rx) = watch::channel(TrackerSnapshot::default());
    tokio::spawn(run_tracker(
        LocationTracker::new(&config.tracking),
        events_rx,
        snapshots_tx,
    ));

    let state = AppState::new(machine, planner, events_tx, snapshots_rx);
    let app = app(state, &config.server);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://localhost:{}", config.server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| "Web server failed")?;

    tracing::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
