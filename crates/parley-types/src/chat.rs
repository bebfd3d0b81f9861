//! Session, turn, and chat exchange types for Parley.
//!
//! A session is an opaque caller-scoped identifier. Every successful chat
//! exchange inside a session is persisted as exactly one immutable [`Turn`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// Opaque conversation identifier.
///
/// Generated identifiers are UUID v7 strings (time-sortable). Identifiers
/// supplied by callers are kept verbatim -- no format or existence check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh session identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap an existing identifier as-is.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One persisted user-message/response pair.
///
/// Turns are written once, after a successful inference call, and never
/// mutated. They are only removed in bulk when their session is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub session_id: SessionId,
    pub user_message: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
}

/// Inbound chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user message (1-4000 characters).
    pub message: String,
    /// Optional session to continue. Absent or empty starts a new session.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Result of a successful chat exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub session_id: SessionId,
}
