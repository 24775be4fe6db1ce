//! Axum server setup and router configuration.

use crate::api::{admin, public};
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Public read API, mounted under both `/ordinals/v1` and `/ordinals`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/ordinals/v1", public::router())
        .nest("/ordinals", public::router())
        .with_state(state)
}

/// Admin RPC, served on its own listener.
pub fn build_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/ordinals/admin", admin::router())
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run one listener with graceful shutdown support.
pub async fn run_server(router: Router, addr: SocketAddr, name: &'static str) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(listener = name, "Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}
