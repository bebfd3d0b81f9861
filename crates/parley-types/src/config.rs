//! Configuration types for Parley.
//!
//! `RelayConfig` is the full deployment configuration: listener, store,
//! inference provider, generation parameters, context windowing, failure
//! policies, and rate limiting. Every field has a default so an empty
//! `config.toml` (or none at all) yields a working setup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::llm::GenerationParams;

/// Top-level configuration for the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub generation: GenerationParams,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl RelayConfig {
    /// Reject values that would make the relay misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.history_limit == 0 {
            return Err(ConfigError::Invalid("chat.history_limit must be at least 1".into()));
        }
        if self.chat.max_message_chars == 0 {
            return Err(ConfigError::Invalid(
                "chat.max_message_chars must be at least 1".into(),
            ));
        }
        if self.rate_limit.quota == 0 {
            return Err(ConfigError::Invalid("rate_limit.quota must be at least 1".into()));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.window_secs must be at least 1".into(),
            ));
        }
        if self.generation.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "generation.max_tokens must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Invalid(format!(
                "generation.temperature must be within 0.0..=2.0, got {}",
                self.generation.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.generation.top_p) {
            return Err(ConfigError::Invalid(format!(
                "generation.top_p must be within 0.0..=1.0, got {}",
                self.generation.top_p
            )));
        }
        if self.store.max_read_connections == 0 {
            return Err(ConfigError::Invalid(
                "store.max_read_connections must be at least 1".into(),
            ));
        }
        if self.inference.model_id.trim().is_empty() {
            return Err(ConfigError::Invalid("inference.model_id must not be empty".into()));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow any origin/method/header (the front-end is served elsewhere).
    #[serde(default = "default_true")]
    pub cors_allow_any: bool,
    /// Key rate limits on the first `X-Forwarded-For` hop instead of the
    /// peer address. Only safe behind a proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allow_any: true,
            trust_forwarded_for: false,
        }
    }
}

/// Conversation store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// sqlx connection URL.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_read_connections")]
    pub max_read_connections: u32,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
    /// Upper bound on any single store operation.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

fn default_database_url() -> String {
    "sqlite://parley.db?mode=rwc".to_string()
}

fn default_max_read_connections() -> u32 {
    8
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_operation_timeout_secs() -> u64 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_read_connections: default_max_read_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

/// Inference provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Override for the runtime endpoint; derived from `region` when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_inference_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_model_id() -> String {
    "deepseek.v3-v1:0".to_string()
}

fn default_api_key_env() -> String {
    "AWS_BEARER_TOKEN_BEDROCK".to_string()
}

fn default_inference_timeout_secs() -> u64 {
    60
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            model_id: default_model_id(),
            endpoint: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_inference_timeout_secs(),
        }
    }
}

impl InferenceConfig {
    /// Runtime endpoint base URL (no trailing slash).
    pub fn resolved_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }
}

/// Conversation windowing and failure policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Most-recent turns fetched from the store per request.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Most-recent turns (of those fetched) placed into the prompt.
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    #[serde(default = "default_max_session_id_chars")]
    pub max_session_id_chars: usize,
    #[serde(default)]
    pub history_read_failure: HistoryReadFailurePolicy,
    #[serde(default)]
    pub persist_failure: PersistFailurePolicy,
}

fn default_history_limit() -> u32 {
    10
}

fn default_context_turns() -> usize {
    5
}

fn default_max_message_chars() -> usize {
    4000
}

fn default_max_session_id_chars() -> usize {
    128
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            context_turns: default_context_turns(),
            max_message_chars: default_max_message_chars(),
            max_session_id_chars: default_max_session_id_chars(),
            history_read_failure: HistoryReadFailurePolicy::default(),
            persist_failure: PersistFailurePolicy::default(),
        }
    }
}

/// What to do when the history read fails before generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryReadFailurePolicy {
    /// Continue with an empty context.
    #[default]
    Degrade,
    /// Fail the request with a storage error.
    Fail,
}

impl fmt::Display for HistoryReadFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryReadFailurePolicy::Degrade => write!(f, "degrade"),
            HistoryReadFailurePolicy::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for HistoryReadFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "degrade" => Ok(HistoryReadFailurePolicy::Degrade),
            "fail" => Ok(HistoryReadFailurePolicy::Fail),
            other => Err(format!("invalid history read policy: '{other}'")),
        }
    }
}

/// What to do when persisting a turn fails after a reply was generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistFailurePolicy {
    /// Log the failure and still return the computed reply.
    #[default]
    ReturnReply,
    /// Fail the whole request with a storage error.
    Fail,
}

impl fmt::Display for PersistFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistFailurePolicy::ReturnReply => write!(f, "return_reply"),
            PersistFailurePolicy::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for PersistFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "return_reply" => Ok(PersistFailurePolicy::ReturnReply),
            "fail" => Ok(PersistFailurePolicy::Fail),
            other => Err(format!("invalid persist failure policy: '{other}'")),
        }
    }
}

/// Per-client fixed-window admission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_quota")]
    pub quota: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_quota() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            quota: default_quota(),
            window_secs: default_window_secs(),
        }
    }
}
