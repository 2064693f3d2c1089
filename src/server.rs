//! Keep-alive HTTP endpoints

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const ALIVE_MESSAGE: &str = "✅ Bot is alive and running!";

#[derive(Clone)]
struct HealthState {
    started: Instant,
}

#[derive(Debug, Serialize)]
struct Uptime {
    status: &'static str,
    /// Seconds since the process started
    uptime: f64,
    timestamp: String,
}

async fn alive() -> &'static str {
    ALIVE_MESSAGE
}

async fn uptime(State(state): State<HealthState>) -> Json<Uptime> {
    Json(Uptime {
        status: "ok",
        uptime: state.started.elapsed().as_secs_f64(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub fn router(started: Instant) -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/uptime", get(uptime))
        .with_state(HealthState { started })
}

pub async fn bind(port: u16) -> Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind health server on port {port}"))
}

/// Serves `/` and `/uptime` until `cancel` fires.
pub async fn serve(listener: TcpListener, started: Instant, cancel: CancellationToken) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "Keep-alive server listening");

    axum::serve(listener, router(started))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("Health server failed")
}
