//! LLM provider implementations.
//!
//! Contains the concrete [`LlmProvider`](parley_core::llm::provider::LlmProvider)
//! implementation for AWS Bedrock, plus a factory ([`create_provider`])
//! that builds it from the inference config and wraps it for dynamic
//! dispatch.

pub mod bedrock;

use secrecy::SecretString;

use parley_core::llm::box_provider::BoxLlmProvider;
use parley_types::config::InferenceConfig;
use parley_types::llm::LlmError;

use self::bedrock::BedrockProvider;

/// Create a [`BoxLlmProvider`] from the inference configuration.
///
/// `api_key` is the already-resolved bearer token.
pub fn create_provider(
    config: &InferenceConfig,
    api_key: SecretString,
) -> Result<BoxLlmProvider, LlmError> {
    let provider = BedrockProvider::from_config(config, api_key)?;
    tracing::info!(
        region = %config.region,
        model_id = %config.model_id,
        endpoint = %config.resolved_endpoint(),
        "Inference provider configured"
    );
    Ok(BoxLlmProvider::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_bedrock() {
        let config = InferenceConfig::default();
        let provider = create_provider(&config, SecretString::from("test-key")).unwrap();
        assert_eq!(provider.name(), "aws.bedrock");
    }
}
