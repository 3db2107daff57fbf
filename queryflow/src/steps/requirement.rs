//! Requirement gathering agent.

use super::{retryable, settle, PipelineStep, StepContext};
use crate::config::PipelineConfig;
use crate::core::{StatisticsRecorder, StepOutput, StepType};
use crate::errors::StepError;
use crate::llm::{run_agent, ChatMessage, LanguageModel, LlmRequest};
use crate::parser::{parse_response, RequirementResponse, StructuredResponse};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Error message when the chosen schema tool does not resolve to a connection.
pub const NO_CONNECTION_MESSAGE: &str =
    "AI could not decide on the database, so no connection id found";

/// Turns the question into a precise requirement against one schema.
///
/// The model may call the schema getters of the tool set (and nothing else)
/// before answering. A clear, not yet answered requirement lets the
/// pipeline continue with the chosen `connection_id`; anything else ends
/// the run with the model's reply.
#[derive(Debug, Clone)]
pub struct RequirementGatherer {
    model: Arc<dyn LanguageModel>,
    config: Arc<PipelineConfig>,
}

impl RequirementGatherer {
    /// Creates the step.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, config: Arc<PipelineConfig>) -> Self {
        Self { model, config }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let step_type = StepType::RequirementsExtraction;
        let handler = ctx.tools.schema_handler();
        let request = LlmRequest::new(&self.config.prompts.requirement)
            .messages(ctx.conversation(self.config.history_depth).await)
            .message(ChatMessage::user(ctx.query))
            .with_tools(handler.specs());

        let mut recorder = StatisticsRecorder::start(self.model.info().clone());
        let outcome = run_agent(
            self.model.as_ref(),
            request,
            &handler,
            self.config.agent_max_iterations,
            &mut recorder,
        )
        .await?;
        let statistics = recorder.finish(step_type);
        debug!(
            iterations = outcome.iterations,
            tool_calls = outcome.tool_calls,
            "Requirement agent finished"
        );

        let Some(raw) = outcome.final_text else {
            return Ok(StepOutput::fail(
                step_type,
                retryable(&self.config, "Agent stopped without a final answer"),
            )
            .with_input(ctx.query_input())
            .with_statistics(statistics));
        };

        let parsed = match parse_response::<RequirementResponse>(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                return Ok(StepOutput::fail(
                    step_type,
                    retryable(&self.config, format!("Error in parsing output: {err}")),
                )
                .with_input(ctx.query_input())
                .with_raw_data(raw)
                .with_statistics(statistics));
            }
        };

        let mut data = parsed.to_data();
        let output = if parsed.is_requirement_clear
            && !parsed.is_already_answered_without_further_queries
        {
            let schema_tool = parsed.schema_tool_name.as_deref().unwrap_or_default();
            match ctx.tools.connection_id_for(schema_tool).await {
                Some(connection_id) => {
                    info!(schema_tool, %connection_id, "Requirement is clear");
                    data.insert("connection_id".to_string(), json!(connection_id));
                    StepOutput::proceed(step_type, data)
                }
                None => StepOutput::fail(step_type, StepError::fatal(NO_CONNECTION_MESSAGE))
                    .with_data(data),
            }
        } else {
            debug!(
                clear = parsed.is_requirement_clear,
                answered = parsed.is_already_answered_without_further_queries,
                "Requirement ends the run"
            );
            StepOutput::finish(step_type, data)
        };

        Ok(output
            .with_input(ctx.query_input())
            .with_raw_data(raw)
            .with_statistics(statistics))
    }
}

#[async_trait]
impl PipelineStep for RequirementGatherer {
    fn name(&self) -> &str {
        "requirement_gatherer"
    }

    fn step_type(&self) -> StepType {
        StepType::RequirementsExtraction
    }

    async fn run(&self, ctx: &StepContext<'_>) -> StepOutput {
        settle(self.step_type(), ctx, self.execute(ctx).await)
    }
}
