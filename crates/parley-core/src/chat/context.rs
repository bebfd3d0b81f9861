//! Prompt context assembly for Parley.
//!
//! `ContextWindow` turns a chronological history read into the role-tagged
//! message list sent to the model. The store read is already bounded
//! (default 10 turns); this applies a second, tighter bound (default 5)
//! so prompt size stays capped regardless of how much history was fetched.

use parley_types::chat::Turn;
use parley_types::llm::Message;

/// Default number of prior turns placed into the prompt.
pub const DEFAULT_CONTEXT_TURNS: usize = 5;

/// Pure transform from history + new message to prompt messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    max_turns: usize,
}

impl ContextWindow {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }

    /// Build the prompt for `new_message`.
    ///
    /// `history` must be chronological (oldest first). The last
    /// `max_turns` turns are each flattened into a user entry followed by
    /// an assistant entry, and the new user message is appended last.
    pub fn build(&self, history: &[Turn], new_message: &str) -> Vec<Message> {
        let start = history.len().saturating_sub(self.max_turns);
        let recent = &history[start..];

        let mut messages = Vec::with_capacity(recent.len() * 2 + 1);
        for turn in recent {
            messages.push(Message::user(turn.user_message.as_str()));
            messages.push(Message::assistant(turn.ai_response.as_str()));
        }
        messages.push(Message::user(new_message));
        messages
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_TURNS)
    }
}
