use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("storage operation timed out after {0}ms")]
    Timeout(u64),
}

/// Errors surfaced by the chat orchestration layer.
///
/// Each variant is a distinct class for the caller: validation and rate
/// limiting are rejected before any I/O, service unavailability is
/// retryable, a missing session is distinct from a generic failure.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("AI service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    #[error("session not found")]
    SessionNotFound,

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl From<LlmError> for ChatError {
    fn from(e: LlmError) -> Self {
        if e.is_service_unavailable() {
            ChatError::ServiceUnavailable(e.to_string())
        } else {
            ChatError::Unexpected(e.to_string())
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("invalid value '{value}' for {var}")]
    InvalidOverride { var: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing secret: environment variable {0} is not set")]
    MissingSecret(String),
}
