//! ConversationStore trait definition.
//!
//! Durable, append-only log of turns keyed by session. Follows the same
//! RPITIT pattern as `LlmProvider`.

use parley_types::chat::{SessionId, Turn};
use parley_types::error::RepositoryError;

/// Port for turn persistence.
///
/// Implementations live in parley-infra (e.g., `SqliteConversationStore`).
/// There is no caching layer: every call hits the backing store, so
/// concurrent requests for one session always see the store's state.
pub trait ConversationStore: Send + Sync {
    /// Append one turn to a session, stamped with the store's write time.
    ///
    /// Returns the persisted turn. A failed write must not be reported as
    /// success, even partially.
    fn append_turn(
        &self,
        session_id: &SessionId,
        user_message: &str,
        ai_response: &str,
    ) -> impl std::future::Future<Output = Result<Turn, RepositoryError>> + Send;

    /// Read the most recent `limit` turns of a session, oldest first.
    ///
    /// An unknown session yields an empty vector, not an error.
    fn read_history(
        &self,
        session_id: &SessionId,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Delete every turn of a session and return how many were removed.
    ///
    /// Zero means the session did not exist.
    fn delete_session(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Run a trivial query to prove the store is reachable.
    fn ping(&self) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
