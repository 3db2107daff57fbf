//! Read-only conversation context for pipeline steps.
//!
//! This module provides:
//! - The `ContextProvider` seam (user instructions and chat history)
//! - Chat turns and their conversion into model messages
//! - A provider backed by the pipeline store

mod history;
mod store_backed;

pub use history::render_step_output;
pub use store_backed::StoreBackedContext;

use crate::llm::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Instructions used when the user has not configured any.
pub const DEFAULT_INSTRUCTIONS: &str = "Be precise and concise in your answers.";

/// History depth applied when a caller asks for `depth <= 0`.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Wraps user instructions in the preamble sent to the model.
#[must_use]
pub fn render_user_instructions(instructions: &str) -> String {
    format!("IMPORTANT FOLLOW THESE INSTRUCTIONS WHEN ANSWERING TO ME: {instructions}")
}

/// Normalizes a requested history depth.
#[must_use]
pub fn effective_depth(depth: i64) -> usize {
    if depth <= 0 {
        DEFAULT_HISTORY_DEPTH
    } else {
        usize::try_from(depth).unwrap_or(DEFAULT_HISTORY_DEPTH)
    }
}

/// Who said a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The user.
    User,
    /// The assistant.
    Ai,
}

/// One turn of chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who spoke.
    pub speaker: Speaker,
    /// What was said.
    pub text: String,
}

impl ChatTurn {
    /// Creates a user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Ai,
            text: text.into(),
        }
    }

    /// Converts the turn into a model message.
    #[must_use]
    pub fn to_message(&self) -> ChatMessage {
        match self.speaker {
            Speaker::User => ChatMessage::user(&self.text),
            Speaker::Ai => ChatMessage::assistant(&self.text),
        }
    }
}

/// Supplies user instructions and chat history to steps.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// The instruction preamble for the model.
    fn user_instructions(&self) -> String;

    /// The last `depth` messages of a thread with their rendered answers,
    /// oldest first. `depth <= 0` means the default depth.
    async fn chat_history(&self, thread_id: &str, depth: i64) -> Vec<ChatTurn>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_instructions_template() {
        assert_eq!(
            render_user_instructions(DEFAULT_INSTRUCTIONS),
            "IMPORTANT FOLLOW THESE INSTRUCTIONS WHEN ANSWERING TO ME: Be precise and concise in your answers."
        );
    }

    #[test]
    fn test_effective_depth() {
        assert_eq!(effective_depth(0), 100);
        assert_eq!(effective_depth(-1), 100);
        assert_eq!(effective_depth(1), 1);
    }

    #[test]
    fn test_turn_to_message() {
        assert_eq!(ChatTurn::user("hi").to_message(), ChatMessage::user("hi"));
        assert_eq!(ChatTurn::ai("hello").to_message(), ChatMessage::assistant("hello"));
    }
}
