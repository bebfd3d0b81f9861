//! SQLite conversation store implementation.
//!
//! Implements `ConversationStore` from `parley-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, reads on the reader
//! pool and writes on the writer pool. Every operation is bounded by the
//! configured store timeout.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use parley_core::chat::repository::ConversationStore;
use parley_types::chat::{SessionId, Turn};
use parley_types::error::RepositoryError;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationStore`.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: DatabasePool,
    op_timeout: Duration,
}

impl SqliteConversationStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    /// Access the underlying pool (for shutdown).
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, RepositoryError> {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| RepositoryError::Timeout(self.op_timeout.as_millis() as u64))?
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct TurnRow {
    session_id: String,
    user_message: String,
    ai_response: String,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            user_message: row.try_get("user_message")?,
            ai_response: row.try_get("ai_response")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        Ok(Turn {
            session_id: SessionId::new(self.session_id),
            user_message: self.user_message,
            ai_response: self.ai_response,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width so that string order matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn map_sqlx(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        other => RepositoryError::Query(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// ConversationStore implementation
// ---------------------------------------------------------------------------

impl ConversationStore for SqliteConversationStore {
    async fn append_turn(
        &self,
        session_id: &SessionId,
        user_message: &str,
        ai_response: &str,
    ) -> Result<Turn, RepositoryError> {
        let created_at = format_datetime(&Utc::now());

        self.bounded(async {
            sqlx::query(
                r#"INSERT INTO conversations (session_id, user_message, ai_response, created_at)
                   VALUES (?, ?, ?, ?)"#,
            )
            .bind(session_id.as_str())
            .bind(user_message)
            .bind(ai_response)
            .bind(&created_at)
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx)
        })
        .await?;

        Ok(Turn {
            session_id: session_id.clone(),
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            created_at: parse_datetime(&created_at)?,
        })
    }

    async fn read_history(
        &self,
        session_id: &SessionId,
        limit: u32,
    ) -> Result<Vec<Turn>, RepositoryError> {
        let rows = self
            .bounded(async {
                sqlx::query(
                    r#"SELECT session_id, user_message, ai_response, created_at
                       FROM conversations
                       WHERE session_id = ?
                       ORDER BY created_at DESC, id DESC
                       LIMIT ?"#,
                )
                .bind(session_id.as_str())
                .bind(i64::from(limit))
                .fetch_all(&self.pool.reader)
                .await
                .map_err(map_sqlx)
            })
            .await?;

        // Newest-first from the query; callers want oldest-first.
        let mut turns = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            let turn_row = TurnRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            turns.push(turn_row.into_turn()?);
        }

        Ok(turns)
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<u64, RepositoryError> {
        let result = self
            .bounded(async {
                sqlx::query("DELETE FROM conversations WHERE session_id = ?")
                    .bind(session_id.as_str())
                    .execute(&self.pool.writer)
                    .await
                    .map_err(map_sqlx)
            })
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.bounded(async {
            sqlx::query("SELECT 1")
                .execute(&self.pool.reader)
                .await
                .map_err(map_sqlx)
        })
        .await?;
        Ok(())
    }
}
