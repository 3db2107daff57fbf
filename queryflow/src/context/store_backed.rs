//! Context provider reading chat history from the pipeline store.

use super::{
    effective_depth, render_step_output, render_user_instructions, ChatTurn, ContextProvider,
    DEFAULT_INSTRUCTIONS,
};
use crate::store::PipelineStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// A [`ContextProvider`] over a [`PipelineStore`].
#[derive(Clone)]
pub struct StoreBackedContext {
    store: Arc<dyn PipelineStore>,
    instructions: String,
}

impl std::fmt::Debug for StoreBackedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBackedContext")
            .field("instructions", &self.instructions)
            .finish_non_exhaustive()
    }
}

impl StoreBackedContext {
    /// Creates a provider with the default instructions.
    #[must_use]
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self {
            store,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }

    /// Overrides the user instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

#[async_trait]
impl ContextProvider for StoreBackedContext {
    fn user_instructions(&self) -> String {
        render_user_instructions(&self.instructions)
    }

    async fn chat_history(&self, thread_id: &str, depth: i64) -> Vec<ChatTurn> {
        let messages = match self
            .store
            .recent_messages(thread_id, effective_depth(depth))
            .await
        {
            Ok(messages) => messages,
            Err(err) => {
                warn!(thread_id, error = %err, "Failed to load chat history");
                return Vec::new();
            }
        };

        let mut history = Vec::new();
        for message in messages {
            history.push(ChatTurn::user(&message.query));

            let outputs = match self.store.step_outputs(&message.id).await {
                Ok(outputs) => outputs,
                Err(err) => {
                    warn!(message_id = %message.id, error = %err, "Failed to load step outputs");
                    continue;
                }
            };
            for record in outputs {
                let rendered = render_step_output(&record.output);
                if !rendered.trim().is_empty() {
                    history.push(ChatTurn::ai(rendered));
                }
            }
        }
        history
    }
}
