//! Anthropic Messages API client.

use super::{ChatMessage, LanguageModel, LlmRequest, LlmResponse, ModelInfo, ToolCall, Usage};
use crate::config::AnthropicConfig;
use crate::errors::{LlmError, LlmResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const API_VERSION: &str = "2023-06-01";

/// A [`LanguageModel`] backed by the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicModel {
    http: reqwest::Client,
    config: AnthropicConfig,
    info: ModelInfo,
}

impl AnthropicModel {
    /// Creates a client from configuration.
    pub fn new(config: AnthropicConfig) -> LlmResult<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::NotConfigured("Anthropic API key is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let info = ModelInfo::new("anthropic", &config.model).with_base_url(&config.base_url);

        Ok(Self { http, config, info })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn body(&self, request: &LlmRequest) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": request.system,
            "messages": encode_messages(&request.messages),
        });
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }
        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.input_schema,
                    })
                })
                .collect();
        }
        body
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn invoke(&self, request: &LlmRequest) -> LlmResult<LlmResponse> {
        debug!(model = %self.config.model, messages = request.messages.len(), "Invoking Anthropic");

        let res = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Anthropic request failed");
            return Err(LlmError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = res
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;
        decode_response(&value)
    }
}

/// Converts the conversation into Messages API blocks. Consecutive tool
/// results are grouped into one user turn.
fn encode_messages(messages: &[ChatMessage]) -> Vec<Value> {
    let mut encoded: Vec<Value> = Vec::new();

    for message in messages {
        match message {
            ChatMessage::User { content } => {
                encoded.push(json!({ "role": "user", "content": content }));
            }
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => {
                let mut blocks = Vec::new();
                if !content.is_empty() {
                    blocks.push(json!({ "type": "text", "text": content }));
                }
                for call in tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                encoded.push(json!({ "role": "assistant", "content": blocks }));
            }
            ChatMessage::ToolResult { call_id, content } => {
                let block = json!({
                    "type": "tool_result",
                    "tool_use_id": call_id,
                    "content": content,
                });
                let appended = encoded.last_mut().and_then(|last| {
                    let is_results = last["role"] == "user" && last["content"].is_array();
                    if is_results {
                        last["content"].as_array_mut()
                    } else {
                        None
                    }
                });
                match appended {
                    Some(blocks) => blocks.push(block),
                    None => encoded.push(json!({ "role": "user", "content": [block] })),
                }
            }
        }
    }

    encoded
}

fn decode_response(value: &Value) -> LlmResult<LlmResponse> {
    let blocks = value["content"]
        .as_array()
        .ok_or_else(|| LlmError::Decode("missing 'content' array".to_string()))?;

    let mut response = LlmResponse::default();
    for block in blocks {
        match block["type"].as_str() {
            Some("text") => {
                if let Some(text) = block["text"].as_str() {
                    response.content.push_str(text);
                }
            }
            Some("tool_use") => {
                let id = block["id"]
                    .as_str()
                    .ok_or_else(|| LlmError::Decode("missing tool_use id".to_string()))?;
                let name = block["name"]
                    .as_str()
                    .ok_or_else(|| LlmError::Decode("missing tool_use name".to_string()))?;
                response.tool_calls.push(ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: block["input"].clone(),
                });
            }
            _ => {}
        }
    }

    response.usage = Usage::new(
        value["usage"]["input_tokens"].as_u64().unwrap_or(0),
        value["usage"]["output_tokens"].as_u64().unwrap_or(0),
    );
    response.stop_reason = value["stop_reason"].as_str().map(str::to_string);
    Ok(response)
}
