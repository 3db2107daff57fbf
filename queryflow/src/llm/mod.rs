//! Language model abstraction.
//!
//! Steps talk to a model only through [`LanguageModel`]. A request carries
//! the system prompt, the conversation so far and the tools the model may
//! call; the response carries text, tool calls and token usage.

mod agent;
#[cfg(feature = "anthropic")]
pub mod anthropic;

pub use agent::{run_agent, AgentOutcome, ToolHandler};

use crate::errors::LlmResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Static description of a model endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Provider name (e.g. `anthropic`).
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Endpoint, when not the provider default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Whether responses are streamed.
    #[serde(default)]
    pub streaming: bool,
}

impl ModelInfo {
    /// Creates model info for a provider and model.
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            base_url: None,
            streaming: false,
        }
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the streaming flag.
    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Provider details recorded in step statistics.
    #[must_use]
    pub fn client_info(&self) -> serde_json::Value {
        let mut info = serde_json::json!({ "provider": self.provider });
        if let Some(url) = &self.base_url {
            info["base_url"] = serde_json::json!(url);
        }
        info
    }
}

/// Token usage of a single model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens.
    pub input_tokens: u64,
    /// Completion tokens.
    pub output_tokens: u64,
}

impl Usage {
    /// Creates a usage record.
    #[must_use]
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Returns total tokens.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// A tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON schema of the tool input.
    pub input_schema: serde_json::Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id.
    pub id: String,
    /// Requested tool.
    pub name: String,
    /// Call arguments.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// One message of a model conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    /// Text from the user.
    User {
        /// Message text.
        content: String,
    },
    /// Text and tool calls from the model.
    Assistant {
        /// Message text.
        content: String,
        /// Tool calls issued with this message.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// The result of a tool call.
    ToolResult {
        /// The call this answers.
        call_id: String,
        /// Tool output.
        content: String,
    },
}

impl ChatMessage {
    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Creates an assistant message without tool calls.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Creates a tool result message.
    #[must_use]
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            call_id: call_id.into(),
            content: content.into(),
        }
    }
}

/// A model invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    /// System prompt.
    pub system: String,
    /// Conversation, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Tools the model may call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
}

impl LlmRequest {
    /// Creates a request with a system prompt.
    #[must_use]
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            ..Self::default()
        }
    }

    /// Appends a message.
    #[must_use]
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Appends several messages.
    #[must_use]
    pub fn messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Sets the callable tools.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

/// A model answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Concatenated text content.
    pub content: String,
    /// Tool calls requested by the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Token usage.
    #[serde(default)]
    pub usage: Usage,
    /// Why generation stopped, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl LlmResponse {
    /// Creates a text-only response.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Sets the usage.
    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Adds a tool call.
    #[must_use]
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// Returns true if the model asked for tools.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A chat model.
#[async_trait]
pub trait LanguageModel: Send + Sync + Debug {
    /// Describes the endpoint.
    fn info(&self) -> &ModelInfo;

    /// Sends one request and waits for the full answer.
    async fn invoke(&self, request: &LlmRequest) -> LlmResult<LlmResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_info() {
        let info = ModelInfo::new("anthropic", "claude").with_base_url("http://localhost:9000");
        assert_eq!(info.client_info()["provider"], "anthropic");
        assert_eq!(info.client_info()["base_url"], "http://localhost:9000");
        assert!(ModelInfo::new("x", "y").client_info().get("base_url").is_none());
    }

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("system")
            .message(ChatMessage::user("hi"))
            .messages(vec![ChatMessage::assistant("hello"), ChatMessage::user("count rows")]);
        assert_eq!(request.messages.len(), 3);
        assert!(request.tools.is_empty());
    }

    #[test]
    fn test_message_serialization_tag() {
        let value = serde_json::to_value(ChatMessage::tool_result("call_1", "schema")).unwrap();
        assert_eq!(value["role"], "tool_result");
        assert_eq!(value["call_id"], "call_1");
    }

    #[test]
    fn test_usage_total() {
        assert_eq!(Usage::new(10, 5).total(), 15);
    }
}
