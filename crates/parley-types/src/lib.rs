//! Shared domain types for Parley.
//!
//! This crate contains the types passed between the relay's layers:
//! sessions and turns, LLM request/response shapes, configuration,
//! and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
