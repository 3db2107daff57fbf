//! Bounded tool-calling loop.

use super::{ChatMessage, LanguageModel, LlmRequest, ToolCall};
use crate::core::StatisticsRecorder;
use crate::errors::LlmResult;
use async_trait::async_trait;
use tracing::debug;

/// Serves tool calls issued by the model.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the call and returns the text handed back to the model.
    async fn call(&self, call: &ToolCall) -> String;
}

/// Result of an agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutcome {
    /// The model's final text; `None` when the iteration budget ran out or
    /// the model ended with an empty answer.
    pub final_text: Option<String>,
    /// Model calls made.
    pub iterations: usize,
    /// Tool calls served.
    pub tool_calls: usize,
}

/// Runs `request` against `model`, serving tool calls through `handler`,
/// until the model answers without tool calls or `max_iterations` model
/// calls have been made. Usage of every call goes to `recorder`.
pub async fn run_agent(
    model: &dyn LanguageModel,
    mut request: LlmRequest,
    handler: &dyn ToolHandler,
    max_iterations: usize,
    recorder: &mut StatisticsRecorder,
) -> LlmResult<AgentOutcome> {
    let mut outcome = AgentOutcome {
        final_text: None,
        iterations: 0,
        tool_calls: 0,
    };

    while outcome.iterations < max_iterations {
        let response = model.invoke(&request).await?;
        outcome.iterations += 1;
        recorder.record(&response.usage);

        if !response.has_tool_calls() {
            if !response.content.trim().is_empty() {
                outcome.final_text = Some(response.content);
            }
            return Ok(outcome);
        }

        let calls = response.tool_calls.clone();
        request.messages.push(ChatMessage::Assistant {
            content: response.content,
            tool_calls: response.tool_calls,
        });

        for call in &calls {
            debug!(tool = %call.name, iteration = outcome.iterations, "Serving tool call");
            let result = handler.call(call).await;
            request.messages.push(ChatMessage::tool_result(&call.id, result));
            outcome.tool_calls += 1;
        }
    }

    debug!(max_iterations, "Agent stopped at iteration limit");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, ModelInfo, Usage};
    use crate::testing::ScriptedModel;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, call: &ToolCall) -> String {
            format!("schema for {}", call.name)
        }
    }

    fn tool_call(id: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: "salesSchemaGetter".to_string(),
            arguments: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_agent_serves_tools_then_finishes() {
        let model = ScriptedModel::new(vec![
            LlmResponse::text("").with_tool_call(tool_call("c1")).with_usage(Usage::new(10, 2)),
            LlmResponse::text("```yaml\nreply: done\n```").with_usage(Usage::new(20, 4)),
        ]);
        let mut recorder = StatisticsRecorder::start(ModelInfo::new("test", "scripted"));

        let outcome = run_agent(&model, LlmRequest::new("sys"), &EchoHandler, 5, &mut recorder)
            .await
            .unwrap();

        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.tool_calls, 1);
        assert_eq!(outcome.final_text.as_deref(), Some("```yaml\nreply: done\n```"));
        assert_eq!(recorder.calls(), 2);

        let second = &model.requests()[1];
        assert!(matches!(
            second.messages.last(),
            Some(ChatMessage::ToolResult { content, .. }) if content == "schema for salesSchemaGetter"
        ));
    }

    #[tokio::test]
    async fn test_agent_stops_at_iteration_limit() {
        let model = ScriptedModel::new(vec![
            LlmResponse::text("").with_tool_call(tool_call("c1")),
            LlmResponse::text("").with_tool_call(tool_call("c2")),
            LlmResponse::text("never reached"),
        ]);
        let mut recorder = StatisticsRecorder::start(ModelInfo::new("test", "scripted"));

        let outcome = run_agent(&model, LlmRequest::new("sys"), &EchoHandler, 2, &mut recorder)
            .await
            .unwrap();

        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.final_text, None);
    }
}
