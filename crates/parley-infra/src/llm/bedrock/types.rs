//! AWS Bedrock `InvokeModel` request/response types.
//!
//! The hosted chat models (DeepSeek and friends) take an OpenAI-style chat
//! body: `model` is omitted (it goes in the URL path) and the reply is read
//! from `choices[0].message.content`.

use serde::{Deserialize, Serialize};

/// Request body for `POST /model/{model_id}/invoke`.
#[derive(Debug, Clone, Serialize)]
pub struct InvokeRequest {
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

/// One role-tagged chat message on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// Response body from `invoke`.
///
/// Every field is optional or defaulted so a structurally odd body still
/// deserializes; the adapter decides whether it carries a usable reply.
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    #[serde(default, alias = "stop_reason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}
