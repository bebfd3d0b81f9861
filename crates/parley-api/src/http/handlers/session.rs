//! Session HTTP handlers.
//!
//! Endpoint:
//! - DELETE /chat/session/{session_id} - Delete all turns of a session

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use parley_types::chat::SessionId;

use crate::http::error::AppError;
use crate::state::AppState;

/// DELETE /chat/session/{session_id}
///
/// 404 when the session has no turns.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session_id = SessionId::new(session_id);
    state.chat_service.delete_session(&session_id).await?;

    Ok(Json(json!({
        "message": format!("Session {session_id} deleted successfully"),
    })))
}
