//! HTTP listener for DAM change notifications.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use codeglance_core::{webhook, PreviewService};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler state.
pub type AppState = Arc<PreviewService>;

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(receive_webhook))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the listener fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}"))?;

    tracing::info!("Listening for webhooks on http://{addr}/webhook");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Queue every supported added/modified file in the notification.
async fn receive_webhook(State(service): State<AppState>, body: Bytes) -> Response {
    match service.ingest(&body) {
        Ok(queued) => (
            StatusCode::OK,
            Json(json!({ "message": webhook::queued_message(queued) })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
