//! Session-level operations over the conversation store.
//!
//! SessionManager owns the store and answers the questions that need no
//! inference provider: what a session holds and how to remove it. Both the
//! HTTP layer (through `ChatService`) and the operator CLI go through it,
//! so a missing session surfaces as the same `SessionNotFound` everywhere.

use parley_types::chat::{SessionId, Turn};
use parley_types::error::ChatError;
use tracing::info;

use crate::chat::repository::ConversationStore;

/// Read and delete whole sessions.
pub struct SessionManager<S: ConversationStore> {
    store: S,
}

impl<S: ConversationStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the conversation store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the most recent `limit` turns of a session, oldest first.
    ///
    /// A session with no turns is reported as [`ChatError::SessionNotFound`].
    pub async fn history(&self, session_id: &SessionId, limit: u32) -> Result<Vec<Turn>, ChatError> {
        let turns = self.store.read_history(session_id, limit).await?;
        if turns.is_empty() {
            return Err(ChatError::SessionNotFound);
        }
        Ok(turns)
    }

    /// Delete every turn of a session.
    ///
    /// Returns the number of turns removed; zero removed is reported as
    /// [`ChatError::SessionNotFound`].
    pub async fn delete(&self, session_id: &SessionId) -> Result<u64, ChatError> {
        let removed = self.store.delete_session(session_id).await?;
        if removed == 0 {
            return Err(ChatError::SessionNotFound);
        }
        info!(session_id = %session_id, removed, "Session deleted");
        Ok(removed)
    }
}
