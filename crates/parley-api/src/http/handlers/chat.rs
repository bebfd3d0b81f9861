//! Chat HTTP handler.
//!
//! Endpoint:
//! - POST /chat - Send a message, get the reply and the session id

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use parley_core::rate::RateDecision;
use parley_types::chat::{ChatReply, ChatRequest};
use parley_types::error::ChatError;

use crate::http::error::AppError;
use crate::http::extractors::client::ClientIdentity;
use crate::state::AppState;

/// POST /chat - One request/response exchange.
///
/// The body is parsed and validated first, so malformed requests are
/// rejected without spending the client's quota. The rate gate then runs
/// before any storage or inference work.
pub async fn chat(
    State(state): State<AppState>,
    client: ClientIdentity,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    state.chat_service.validate(&request)?;

    if let RateDecision::Limited { retry_after } = state.rate_gate.check(client.as_str()) {
        tracing::warn!(client = %client, ?retry_after, "Rate limit exceeded");
        return Err(ChatError::RateLimited {
            retry_after_secs: whole_seconds(retry_after),
        }
        .into());
    }

    let reply = state.chat_service.send_message(request).await?;
    tracing::info!(client = %client, session_id = %reply.session_id, "Chat exchange completed");

    Ok(Json(reply))
}

/// Round up so clients never retry before the window actually resets.
fn whole_seconds(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}
