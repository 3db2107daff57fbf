//! Data summarization.

use super::format::rows_to_csv;
use super::{retryable, settle, PipelineStep, StepContext, NO_DATA_SUMMARY};
use crate::config::PipelineConfig;
use crate::core::{StatisticsRecorder, StepData, StepOutput, StepType};
use crate::errors::StepError;
use crate::llm::{ChatMessage, LanguageModel, LlmRequest};
use crate::parser::{parse_response, StructuredResponse, SummaryResponse};
use crate::tools::{QueryOutcome, QueryRows};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Summarizes the rows returned by the generated SQL. Always terminal.
#[derive(Debug, Clone)]
pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    config: Arc<PipelineConfig>,
}

impl Summarizer {
    /// Creates the step.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, config: Arc<PipelineConfig>) -> Self {
        Self { model, config }
    }

    /// Rows carried over from SQL generation, or the first page of a fresh
    /// execution when none were carried.
    async fn rows(
        &self,
        ctx: &StepContext<'_>,
        connection_id: &str,
        sql: &str,
    ) -> Result<QueryRows, StepError> {
        if let Some(rows) = ctx
            .state
            .get("sql_data")
            .and_then(QueryRows::from_value)
            .filter(|rows| !rows.is_empty())
        {
            debug!(rows = rows.len(), "Summarizing rows from SQL generation");
            return Ok(rows);
        }

        info!(connection_id, "Re-executing SQL for summarization");
        match ctx
            .tools
            .execute_paged(connection_id, sql, 1, self.config.summary_page_size)
            .await?
        {
            QueryOutcome::Rows(rows) => Ok(rows),
            QueryOutcome::Error(error) => Err(StepError::fatal(error)),
        }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let step_type = StepType::DataSummarization;
        let schema_tool = ctx.require("schema_tool_name", "No schema found")?;
        let requirement = ctx.require("requirement", "No requirement found")?;
        let connection_id = ctx.require("connection_id", "No connection_id found")?;
        let sql = ctx.require("sql", "No sql found")?;

        if ctx.tools.get(schema_tool).is_none() {
            return Err(StepError::fatal("No schema tool found"));
        }
        let schema = ctx.tools.schema_text(schema_tool).await?;

        let mut input = ctx.query_input();
        input.insert("sql".to_string(), json!(sql));
        input.insert("requirement".to_string(), json!(requirement));

        let rows = self.rows(ctx, connection_id, sql).await?;
        if rows.is_empty() {
            debug!("Query returned no rows, skipping the model");
            let mut data = StepData::new();
            data.insert("reply".to_string(), json!(NO_DATA_SUMMARY));
            data.insert("data_summary".to_string(), json!(NO_DATA_SUMMARY));
            return Ok(StepOutput::finish(step_type, data).with_input(input));
        }

        let csv = rows_to_csv(&rows, self.config.sample_rows);
        let request = LlmRequest::new(&self.config.prompts.summarization)
            .message(ChatMessage::user(ctx.context.user_instructions()))
            .message(ChatMessage::user(format!(
                "Database schema:\n{schema}\n\nRequirement: {requirement}\n\nSQL query:\n{sql}\n\nSQL data:\n{csv}"
            )));

        let mut recorder = StatisticsRecorder::start(self.model.info().clone());
        let response = self.model.invoke(&request).await?;
        recorder.record(&response.usage);
        let statistics = recorder.finish(step_type);

        let output = match parse_response::<SummaryResponse>(&response.content) {
            Ok(parsed) => StepOutput::finish(step_type, parsed.to_data()),
            Err(err) => StepOutput::fail(
                step_type,
                retryable(&self.config, format!("Error in parsing output: {err}")),
            ),
        };

        Ok(output
            .with_input(input)
            .with_raw_data(response.content)
            .with_statistics(statistics))
    }
}

#[async_trait]
impl PipelineStep for Summarizer {
    fn name(&self) -> &str {
        "summarizer"
    }

    fn step_type(&self) -> StepType {
        StepType::DataSummarization
    }

    async fn run(&self, ctx: &StepContext<'_>) -> StepOutput {
        settle(self.step_type(), ctx, self.execute(ctx).await)
    }
}
