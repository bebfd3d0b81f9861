//! LlmProvider trait definition.
//!
//! This is the inference gateway abstraction that every provider
//! implements. Uses RPITIT for `complete`; `BoxLlmProvider` adds dynamic
//! dispatch on top.

use parley_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM provider backends (Bedrock, test doubles, etc.).
///
/// One call is one attempt: implementations must not retry internally.
/// Failures are classified through [`LlmError::is_service_unavailable`].
///
/// Implementations live in parley-infra (e.g., `BedrockProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "aws.bedrock").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
