//! BedrockProvider -- concrete [`LlmProvider`] implementation for AWS Bedrock.
//!
//! Sends a single non-streaming `invoke` request to the Bedrock Runtime API
//! using Bearer token authentication, and validates the reply shape before
//! handing it to the chat service.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use parley_core::llm::provider::LlmProvider;
use parley_types::config::InferenceConfig;
use parley_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};
use secrecy::{ExposeSecret, SecretString};

use super::types::{InvokeRequest, InvokeResponse, WireMessage};

/// AWS Bedrock chat-model provider.
///
/// # API Key Security
///
/// The API key is stored as a [`SecretString`] and is only exposed when
/// constructing HTTP request headers. It never appears in Debug output.
pub struct BedrockProvider {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model_id: String,
    timeout: Duration,
}

impl BedrockProvider {
    /// Prefix used to identify Bedrock API keys.
    const KEY_PREFIX: &'static str = "bedrock-api-key-";

    /// Create a new Bedrock provider.
    ///
    /// * `api_key` - Bedrock bearer token. A leading `bedrock-api-key-`
    ///   prefix is stripped and the remainder is sent as the Bearer token.
    /// * `model_id` - Bedrock model identifier (e.g., `deepseek.v3-v1:0`).
    /// * `endpoint` - Runtime base URL without trailing slash.
    /// * `timeout` - Whole-request timeout for the HTTP client.
    pub fn new(
        api_key: SecretString,
        model_id: String,
        endpoint: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("failed to create HTTP client: {e}")))?;

        let raw_key = api_key.expose_secret();
        let token_part = raw_key.strip_prefix(Self::KEY_PREFIX).unwrap_or(raw_key);
        let bearer_token = SecretString::from(token_part.to_string());

        Ok(Self {
            client,
            api_key: bearer_token,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model_id,
            timeout,
        })
    }

    /// Create a provider from the inference section of the relay config.
    pub fn from_config(config: &InferenceConfig, api_key: SecretString) -> Result<Self, LlmError> {
        Self::new(
            api_key,
            config.model_id.clone(),
            config.resolved_endpoint(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Build the `invoke` URL for a model.
    fn url(&self, model_id: &str) -> String {
        format!("{}/model/{}/invoke", self.endpoint, model_id)
    }

    /// Convert a generic [`CompletionRequest`] into the wire body.
    fn to_invoke_request(request: &CompletionRequest) -> InvokeRequest {
        let messages = request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        InvokeRequest {
            messages,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
        }
    }

    /// Map a non-2xx status to an error. Every variant produced here is
    /// in the service-unavailable class.
    fn error_for_status(status: u16, body: String) -> LlmError {
        match status {
            401 | 403 => LlmError::AuthenticationFailed,
            429 => LlmError::RateLimited,
            503 | 529 => LlmError::Overloaded(body),
            _ => LlmError::Provider {
                status,
                message: body,
            },
        }
    }

    /// Extract the reply from a decoded body, rejecting unusable shapes.
    fn into_completion(resp: InvokeResponse) -> Result<CompletionResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".into()))?;

        let content = choice
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| LlmError::InvalidResponse("first choice has no message content".into()))?;

        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse("reply text is empty".into()));
        }

        let usage = resp
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: resp.id,
            content,
            model: resp.model,
            finish_reason: choice.finish_reason,
            usage,
        })
    }
}

// BedrockProvider intentionally does NOT derive Debug to prevent
// accidental exposure of the bearer token.

impl LlmProvider for BedrockProvider {
    fn name(&self) -> &str {
        "aws.bedrock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let model_id = if request.model.is_empty() {
            self.model_id.as_str()
        } else {
            request.model.as_str()
        };
        let body = Self::to_invoke_request(request);
        let url = self.url(model_id);

        tracing::debug!(url = %url, model_id = %model_id, messages = body.messages.len(), "Bedrock invoke request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout.as_millis() as u64)
                } else {
                    LlmError::Transport(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %error_body, url = %url, "Bedrock API error response");
            return Err(Self::error_for_status(status.as_u16(), error_body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to read response body: {e}")))?;
        let invoke_resp: InvokeResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        Self::into_completion(invoke_resp)
    }
}
