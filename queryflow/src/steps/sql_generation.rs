//! SQL generation with execution feedback.

use super::{retryable, settle, PipelineStep, StepContext};
use crate::config::PipelineConfig;
use crate::core::{StatisticsRecorder, StepData, StepOutput, StepType};
use crate::errors::StepError;
use crate::llm::{ChatMessage, LanguageModel, LlmRequest};
use crate::parser::{parse_response, SqlGenerationResponse, StructuredResponse};
use crate::tools::QueryOutcome;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error message when the model declines to write SQL.
pub const EMPTY_SQL_MESSAGE: &str = "Failed to generate sql query";

/// Writes SQL for the gathered requirement and verifies it by running it.
///
/// Execution errors are fed back to the model together with the failing
/// SQL, up to `sql_generation_attempts` times. Token usage accumulates over
/// all attempts into a single statistics record.
#[derive(Debug, Clone)]
pub struct SqlGenerator {
    model: Arc<dyn LanguageModel>,
    config: Arc<PipelineConfig>,
}

/// SQL and error of the previous attempt.
#[derive(Debug, Default)]
struct Feedback {
    sql: String,
    error: String,
}

impl SqlGenerator {
    /// Creates the step.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, config: Arc<PipelineConfig>) -> Self {
        Self { model, config }
    }

    fn request(&self, schema: &str, requirement: &str, feedback: &Feedback) -> LlmRequest {
        LlmRequest::new(format!(
            "{}\n\nDatabase Schema DDL with Instructions: {schema}",
            self.config.prompts.sql_generation
        ))
        .message(ChatMessage::user(format!("Requirement: {requirement}")))
        .message(ChatMessage::user(format!(
            "Previous SQL you generated: {}",
            feedback.sql
        )))
        .message(ChatMessage::user(format!(
            "Error when executing previous SQL: {}",
            feedback.error
        )))
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let step_type = StepType::NaturalLanguageToSql;
        let schema_tool = ctx.require("schema_tool_name", "No schema found")?;
        let requirement = ctx.require("requirement", "No requirement found")?;

        if ctx.tools.get(schema_tool).is_none() {
            return Err(StepError::fatal("No schema tool found"));
        }
        let executor = ctx
            .tools
            .executor_for_schema(schema_tool)
            .ok_or_else(|| StepError::fatal(format!("No query executor found for {schema_tool}")))?;
        let schema = ctx.tools.schema_text(schema_tool).await?;

        let mut input = StepData::new();
        input.insert("requirement".to_string(), json!(requirement));

        let mut recorder = StatisticsRecorder::start(self.model.info().clone());
        let mut feedback = Feedback::default();
        let attempts = self.config.sql_generation_attempts.max(1);

        for attempt in 1..=attempts {
            let response = self
                .model
                .invoke(&self.request(&schema, requirement, &feedback))
                .await?;
            recorder.record(&response.usage);
            let raw = response.content;

            let parsed = match parse_response::<SqlGenerationResponse>(&raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    return Ok(StepOutput::fail(
                        step_type,
                        retryable(&self.config, format!("Error in parsing output: {err}")),
                    )
                    .with_input(input)
                    .with_raw_data(raw)
                    .with_statistics(recorder.finish(step_type)));
                }
            };

            let sql = parsed.sql.as_deref().map(str::trim).unwrap_or_default();
            if sql.is_empty() {
                return Ok(
                    StepOutput::fail(step_type, retryable(&self.config, EMPTY_SQL_MESSAGE))
                        .with_data(parsed.to_data())
                        .with_input(input)
                        .with_raw_data(raw)
                        .with_statistics(recorder.finish(step_type)),
                );
            }

            match ctx.tools.execute(&executor.name, sql).await? {
                QueryOutcome::Rows(rows) => {
                    debug!(attempt, rows = rows.len(), "Generated SQL executed");
                    let mut data = parsed.to_data();
                    data.insert("sql".to_string(), json!(sql));
                    data.insert(
                        "sql_data".to_string(),
                        rows.truncated(self.config.sample_rows).to_value(),
                    );
                    return Ok(StepOutput::proceed(step_type, data)
                        .with_input(input)
                        .with_raw_data(raw)
                        .with_statistics(recorder.finish(step_type))
                        .add_metadata("generation_attempts", json!(attempt)));
                }
                QueryOutcome::Error(error) => {
                    warn!(attempt, attempts, %error, "Generated SQL failed, asking for a fix");
                    feedback = Feedback {
                        sql: sql.to_string(),
                        error,
                    };
                }
            }
        }

        Ok(StepOutput::fail(step_type, StepError::fatal(feedback.error))
            .with_input(input)
            .with_statistics(recorder.finish(step_type))
            .add_metadata("generation_attempts", json!(attempts))
            .add_metadata("last_sql", json!(feedback.sql)))
    }
}

#[async_trait]
impl PipelineStep for SqlGenerator {
    fn name(&self) -> &str {
        "sql_generator"
    }

    fn step_type(&self) -> StepType {
        StepType::NaturalLanguageToSql
    }

    async fn run(&self, ctx: &StepContext<'_>) -> StepOutput {
        settle(self.step_type(), ctx, self.execute(ctx).await)
    }
}
