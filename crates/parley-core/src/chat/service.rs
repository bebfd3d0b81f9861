//! Chat service orchestrating one request/response exchange.
//!
//! ChatService coordinates the ConversationStore, the ContextWindow, and
//! the inference provider: resolve the session, read recent history, build
//! the prompt, generate a reply, persist the turn, and hand the reply back.
//! A turn is written only after generation succeeds, so a failed inference
//! call never leaves a half-written exchange behind.

use std::time::{Duration, Instant};

use parley_types::chat::{ChatReply, ChatRequest, SessionId, Turn};
use parley_types::config::{HistoryReadFailurePolicy, PersistFailurePolicy, RelayConfig};
use parley_types::error::ChatError;
use parley_types::llm::{CompletionRequest, CompletionResponse, GenerationParams, LlmError};
use tracing::{Instrument, debug, error, info_span, warn};

use crate::chat::context::ContextWindow;
use crate::chat::repository::ConversationStore;
use crate::chat::session::SessionManager;
use crate::llm::box_provider::BoxLlmProvider;

/// Per-deployment knobs for [`ChatService`].
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Model identifier passed to the provider.
    pub model: String,
    pub params: GenerationParams,
    /// Most-recent turns read from the store per request.
    pub history_limit: u32,
    pub max_message_chars: usize,
    pub max_session_id_chars: usize,
    pub history_read_failure: HistoryReadFailurePolicy,
    pub persist_failure: PersistFailurePolicy,
    /// Upper bound on a single inference call.
    pub inference_timeout: Duration,
}

impl ChatSettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            model: config.inference.model_id.clone(),
            params: config.generation.clone(),
            history_limit: config.chat.history_limit,
            max_message_chars: config.chat.max_message_chars,
            max_session_id_chars: config.chat.max_session_id_chars,
            history_read_failure: config.chat.history_read_failure,
            persist_failure: config.chat.persist_failure,
            inference_timeout: Duration::from_secs(config.inference.timeout_secs),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// Orchestrates a chat exchange end to end.
///
/// Generic over `ConversationStore` so parley-core never depends on
/// parley-infra. The provider is type-erased behind [`BoxLlmProvider`].
/// Holds no per-session state; concurrent requests for the same session
/// are not serialized and may each read the same history.
pub struct ChatService<S: ConversationStore> {
    sessions: SessionManager<S>,
    provider: BoxLlmProvider,
    context: ContextWindow,
    settings: ChatSettings,
}

impl<S: ConversationStore> ChatService<S> {
    pub fn new(
        store: S,
        provider: BoxLlmProvider,
        context: ContextWindow,
        settings: ChatSettings,
    ) -> Self {
        Self {
            sessions: SessionManager::new(store),
            provider,
            context,
            settings,
        }
    }

    /// Build a service from the relay configuration.
    pub fn from_config(store: S, provider: BoxLlmProvider, config: &RelayConfig) -> Self {
        Self::new(
            store,
            provider,
            ContextWindow::new(config.chat.context_turns),
            ChatSettings::from_config(config),
        )
    }

    /// Access the conversation store.
    pub fn store(&self) -> &S {
        self.sessions.store()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Handle one chat message.
    ///
    /// On success exactly one turn has been appended to the returned
    /// session (unless persistence failed under
    /// [`PersistFailurePolicy::ReturnReply`], which is logged). On failure
    /// before or during generation nothing is appended.
    pub async fn send_message(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        self.validate(&request)?;
        let session_id = self.resolve_session(request.session_id);

        let history = self.load_history(&session_id).await?;
        let messages = self.context.build(&history, &request.message);
        debug!(
            session_id = %session_id,
            history_turns = history.len(),
            prompt_messages = messages.len(),
            "Built prompt context"
        );

        let completion = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            params: self.settings.params.clone(),
        };
        let response = self.generate(&completion).await.map_err(|e| {
            warn!(session_id = %session_id, error = %e, "Inference failed");
            ChatError::from(e)
        })?;

        self.persist(&session_id, &request.message, &response.content)
            .await?;

        Ok(ChatReply {
            response: response.content,
            session_id,
        })
    }

    /// Delete every turn of a session; see [`SessionManager::delete`].
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<u64, ChatError> {
        self.sessions.delete(session_id).await
    }

    /// Prove the store is reachable.
    pub async fn check_ready(&self) -> Result<(), ChatError> {
        Ok(self.store().ping().await?)
    }

    /// Check a request against the length limits without touching any I/O.
    pub fn validate(&self, request: &ChatRequest) -> Result<(), ChatError> {
        let chars = request.message.chars().count();
        if chars == 0 {
            return Err(ChatError::Validation("message must not be empty".to_string()));
        }
        if chars > self.settings.max_message_chars {
            return Err(ChatError::Validation(format!(
                "message must be at most {} characters, got {chars}",
                self.settings.max_message_chars
            )));
        }
        if let Some(id) = &request.session_id {
            if id.chars().count() > self.settings.max_session_id_chars {
                return Err(ChatError::Validation(format!(
                    "session_id must be at most {} characters",
                    self.settings.max_session_id_chars
                )));
            }
        }
        Ok(())
    }

    /// Use the caller's session id verbatim, or mint one when absent/empty.
    fn resolve_session(&self, requested: Option<String>) -> SessionId {
        match requested {
            Some(id) if !id.is_empty() => SessionId::new(id),
            _ => {
                let id = SessionId::generate();
                debug!(session_id = %id, "Started new session");
                id
            }
        }
    }

    async fn load_history(&self, session_id: &SessionId) -> Result<Vec<Turn>, ChatError> {
        match self
            .store()
            .read_history(session_id, self.settings.history_limit)
            .await
        {
            Ok(turns) => Ok(turns),
            Err(e) => match self.settings.history_read_failure {
                HistoryReadFailurePolicy::Degrade => {
                    warn!(
                        session_id = %session_id,
                        error = %e,
                        "History read failed, continuing without context"
                    );
                    Ok(Vec::new())
                }
                HistoryReadFailurePolicy::Fail => Err(ChatError::Storage(e)),
            },
        }
    }

    /// Single inference attempt under a GenAI span and a hard timeout.
    async fn generate(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let span = info_span!(
            "gen_ai.chat",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.params.max_tokens,
            gen_ai.request.temperature = request.params.temperature,
            gen_ai.request.top_p = request.params.top_p,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reason = tracing::field::Empty,
        );

        let timeout = self.settings.inference_timeout;
        let start = Instant::now();
        let result = tokio::time::timeout(
            timeout,
            self.provider.complete(request).instrument(span.clone()),
        )
        .await
        .unwrap_or_else(|_| Err(LlmError::Timeout(timeout.as_millis() as u64)));

        if let Ok(response) = &result {
            span.record("gen_ai.usage.input_tokens", response.usage.input_tokens);
            span.record("gen_ai.usage.output_tokens", response.usage.output_tokens);
            if let Some(reason) = &response.finish_reason {
                span.record("gen_ai.response.finish_reason", reason.as_str());
            }
            debug!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                output_chars = response.content.len(),
                "Inference completed"
            );
        }
        result
    }

    async fn persist(
        &self,
        session_id: &SessionId,
        user_message: &str,
        ai_response: &str,
    ) -> Result<(), ChatError> {
        match self
            .store()
            .append_turn(session_id, user_message, ai_response)
            .await
        {
            Ok(_) => {
                debug!(session_id = %session_id, "Turn persisted");
                Ok(())
            }
            Err(e) => match self.settings.persist_failure {
                PersistFailurePolicy::ReturnReply => {
                    error!(
                        session_id = %session_id,
                        error = %e,
                        "Failed to persist turn, returning reply anyway"
                    );
                    Ok(())
                }
                PersistFailurePolicy::Fail => {
                    error!(session_id = %session_id, error = %e, "Failed to persist turn");
                    Err(ChatError::Storage(e))
                }
            },
        }
    }
}
