//! Conversation persistence port, context windowing, and the chat service.
//!
//! `ConversationStore` is implemented by the infrastructure layer;
//! `ContextWindow` is a pure transform; `SessionManager` reads and deletes
//! whole sessions; `ChatService` sequences one request through all of them
//! plus the LLM provider.

pub mod context;
pub mod repository;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
