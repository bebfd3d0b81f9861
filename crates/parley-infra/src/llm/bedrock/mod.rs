//! AWS Bedrock provider.
//!
//! Non-streaming `InvokeModel` calls against the Bedrock Runtime API with
//! Bearer token authentication and an OpenAI-style chat body.

pub mod client;
pub mod types;

pub use client::BedrockProvider;
