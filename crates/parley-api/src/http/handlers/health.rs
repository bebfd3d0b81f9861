//! Liveness and readiness probes.
//!
//! Endpoints:
//! - GET /       - Process is up (no dependencies touched)
//! - GET /health - Store answers a trivial query

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::state::AppState;

/// GET / - Liveness.
pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Parley Chat API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health - Readiness.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match state.chat_service.check_ready().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "timestamp": timestamp,
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": format!("error: {e}"),
                    "timestamp": timestamp,
                })),
            )
        }
    }
}
