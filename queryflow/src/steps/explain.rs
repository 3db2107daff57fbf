//! SQL explanation.

use super::{retryable, settle, PipelineStep, StepContext};
use crate::config::PipelineConfig;
use crate::core::{StatisticsRecorder, StepOutput, StepType};
use crate::errors::StepError;
use crate::llm::{ChatMessage, LanguageModel, LlmRequest};
use crate::parser::{parse_response, ExplanationResponse, StructuredResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Explains the SQL in the user's question against a known schema.
///
/// Only the last turn of the thread is sent along. Terminal.
#[derive(Debug, Clone)]
pub struct SqlExplainer {
    model: Arc<dyn LanguageModel>,
    config: Arc<PipelineConfig>,
}

impl SqlExplainer {
    /// Creates the step.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, config: Arc<PipelineConfig>) -> Self {
        Self { model, config }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let step_type = StepType::ExplainSqlQuery;
        let schema_tool = ctx.require("schema_tool_name", "No schema found")?;
        ctx.require("requirement", "No requirement found")?;

        if ctx.tools.get(schema_tool).is_none() {
            return Err(StepError::fatal("No schema tool found"));
        }
        let schema = ctx.tools.schema_text(schema_tool).await?;

        let request = LlmRequest::new(&self.config.prompts.explanation)
            .message(ChatMessage::user(schema))
            .messages(ctx.conversation(1).await)
            .message(ChatMessage::user(ctx.query));

        let mut recorder = StatisticsRecorder::start(self.model.info().clone());
        let response = self.model.invoke(&request).await?;
        recorder.record(&response.usage);

        let output = match parse_response::<ExplanationResponse>(&response.content) {
            Ok(parsed) => StepOutput::finish(step_type, parsed.to_data()),
            Err(err) => StepOutput::fail(
                step_type,
                retryable(&self.config, format!("Error in parsing output: {err}")),
            ),
        };

        Ok(output
            .with_input(ctx.query_input())
            .with_raw_data(response.content)
            .with_statistics(recorder.finish(step_type)))
    }
}

#[async_trait]
impl PipelineStep for SqlExplainer {
    fn name(&self) -> &str {
        "sql_explainer"
    }

    fn step_type(&self) -> StepType {
        StepType::ExplainSqlQuery
    }

    async fn run(&self, ctx: &StepContext<'_>) -> StepOutput {
        settle(self.step_type(), ctx, self.execute(ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ChatTurn;
    use crate::core::StepOutcome;
    use crate::llm::LlmResponse;
    use crate::testing::{sales_connection, ScriptedModel, StaticConnector, StaticContext, StepHarness};
    use crate::tools::ToolSet;
    use serde_json::json;

    fn harness() -> StepHarness {
        let connector = StaticConnector::new().with_schema("conn-1", "orders(id int, total numeric)");
        StepHarness::new("SELECT sum(total) FROM orders")
            .with_tools(ToolSet::from_connections(vec![sales_connection()], Arc::new(connector)))
            .with_context(
                StaticContext::new().with_history(vec![
                    ChatTurn::user("old question"),
                    ChatTurn::ai("old answer"),
                ]),
            )
            .with_state("schema_tool_name", json!("salesDataSchemaGetter"))
            .with_state("requirement", json!("Explain the query."))
    }

    #[tokio::test]
    async fn test_explains_query() {
        let model = Arc::new(ScriptedModel::new(vec![LlmResponse::text(
            "```yaml\nreply: Sure.\nexplanation: |\n  Adds up all order totals.\n```",
        )]));
        let step = SqlExplainer::new(model.clone(), Arc::new(PipelineConfig::default()));
        let harness = harness();

        let output = step.run(&harness.ctx()).await;

        assert_eq!(output.outcome(), StepOutcome::Terminal);
        assert_eq!(output.get_str("explanation"), Some("Adds up all order totals.\n"));

        let request = &model.requests()[0];
        assert!(matches!(
            &request.messages[0],
            ChatMessage::User { content } if content.contains("orders(id int")
        ));
        // schema, instructions, one history turn, the query
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[2], ChatMessage::assistant("old answer"));
    }

    #[tokio::test]
    async fn test_requires_schema_tool() {
        let model = Arc::new(ScriptedModel::new(Vec::new()));
        let step = SqlExplainer::new(model, Arc::new(PipelineConfig::default()));
        let harness = StepHarness::new("SELECT 1");

        let output = step.run(&harness.ctx()).await;
        assert_eq!(output.error, Some(StepError::fatal("No schema found")));
    }
}
