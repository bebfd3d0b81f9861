//! In-memory `ConversationStore` shared by the chat unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use parley_types::chat::{SessionId, Turn};
use parley_types::error::RepositoryError;

use crate::chat::repository::ConversationStore;

#[derive(Default)]
struct MemoryStoreInner {
    sessions: HashMap<String, Vec<Turn>>,
    appends: usize,
    fail_reads: bool,
    fail_writes: bool,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemoryStore {
    pub(crate) fn failing_reads() -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().fail_reads = true;
        store
    }

    pub(crate) fn failing_writes() -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().fail_writes = true;
        store
    }

    pub(crate) fn appends(&self) -> usize {
        self.inner.lock().unwrap().appends
    }

    pub(crate) fn turns(&self, session: &str) -> Vec<Turn> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .get(session)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn seed(&self, session: &str, pairs: &[(&str, &str)]) {
        let mut inner = self.inner.lock().unwrap();
        let turns = inner.sessions.entry(session.to_string()).or_default();
        for (user, ai) in pairs {
            turns.push(Turn {
                session_id: SessionId::new(session),
                user_message: user.to_string(),
                ai_response: ai.to_string(),
                created_at: Utc::now(),
            });
        }
    }
}

impl ConversationStore for MemoryStore {
    async fn append_turn(
        &self,
        session_id: &SessionId,
        user_message: &str,
        ai_response: &str,
    ) -> Result<Turn, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(RepositoryError::Connection);
        }
        let turn = Turn {
            session_id: session_id.clone(),
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            created_at: Utc::now(),
        };
        inner
            .sessions
            .entry(session_id.as_str().to_string())
            .or_default()
            .push(turn.clone());
        inner.appends += 1;
        Ok(turn)
    }

    async fn read_history(
        &self,
        session_id: &SessionId,
        limit: u32,
    ) -> Result<Vec<Turn>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(RepositoryError::Query("table missing".to_string()));
        }
        let turns = inner
            .sessions
            .get(session_id.as_str())
            .cloned()
            .unwrap_or_default();
        let start = turns.len().saturating_sub(limit as usize);
        Ok(turns[start..].to_vec())
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .remove(session_id.as_str())
            .map(|t| t.len() as u64)
            .unwrap_or(0))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
