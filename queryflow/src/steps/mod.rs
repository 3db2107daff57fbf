//! Pipeline steps.
//!
//! A step reads the question, the shared state and its collaborators and
//! returns exactly one [`StepOutput`]. Steps never mutate the state; the
//! orchestrator merges their data.
//!
//! The default sequence is classifier, requirement gatherer, SQL generator
//! and summarizer. The SQL explainer answers a separate kind of request and
//! is not part of it.

mod classifier;
mod explain;
pub mod format;
pub mod prompts;
mod requirement;
mod sql_generation;
mod summarization;

pub use classifier::Classifier;
pub use explain::SqlExplainer;
pub use prompts::{Prompts, NO_DATA_SUMMARY};
pub use requirement::{RequirementGatherer, NO_CONNECTION_MESSAGE};
pub use sql_generation::{SqlGenerator, EMPTY_SQL_MESSAGE};
pub use summarization::Summarizer;

use crate::config::PipelineConfig;
use crate::context::ContextProvider;
use crate::core::{StepData, StepOutput, StepType};
use crate::errors::StepError;
use crate::llm::{ChatMessage, LanguageModel};
use crate::pipeline::PipelineState;
use crate::tools::ToolSet;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Everything a step may read during one execution.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    /// The user's question.
    pub query: &'a str,
    /// The expert (tenant) answering the question.
    pub expert_id: &'a str,
    /// The conversation thread.
    pub thread_id: &'a str,
    /// Tools bound for this invocation.
    pub tools: &'a ToolSet,
    /// Instructions and chat history.
    pub context: &'a dyn ContextProvider,
    /// Data accumulated by earlier steps.
    pub state: &'a PipelineState,
}

impl std::fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("query", &self.query)
            .field("expert_id", &self.expert_id)
            .field("thread_id", &self.thread_id)
            .field("tools", self.tools)
            .field("state", self.state)
            .finish_non_exhaustive()
    }
}

impl StepContext<'_> {
    /// The `{query}` input recorded on every output.
    #[must_use]
    pub fn query_input(&self) -> StepData {
        let mut input = StepData::new();
        input.insert("query".to_string(), serde_json::json!(self.query));
        input
    }

    /// Reads a non-empty string from the state or fails fatally with `message`.
    pub fn require(&self, key: &str, message: &str) -> Result<&str, StepError> {
        self.state
            .get_str(key)
            .ok_or_else(|| StepError::fatal(message))
    }

    /// User instructions followed by the last `depth` turns of the thread.
    pub async fn conversation(&self, depth: i64) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::user(self.context.user_instructions())];
        messages.extend(
            self.context
                .chat_history(self.thread_id, depth)
                .await
                .iter()
                .map(|turn| turn.to_message()),
        );
        messages
    }
}

/// Uniform contract of a pipeline step.
#[async_trait]
pub trait PipelineStep: Send + Sync + Debug {
    /// Returns the name used in logs and events.
    fn name(&self) -> &str;

    /// Returns the tag written on every output.
    fn step_type(&self) -> StepType;

    /// Runs the step. Failures are reported in the output, never raised.
    async fn run(&self, ctx: &StepContext<'_>) -> StepOutput;
}

/// Folds an internal failure into a terminal output.
pub(crate) fn settle(
    step_type: StepType,
    ctx: &StepContext<'_>,
    result: Result<StepOutput, StepError>,
) -> StepOutput {
    match result {
        Ok(output) => output,
        Err(err) => StepOutput::fail(step_type, err).with_input(ctx.query_input()),
    }
}

pub(crate) fn retryable(config: &PipelineConfig, message: impl Into<String>) -> StepError {
    StepError::retryable_with_budget(message, config.step_retry_budget)
}

/// The closed set of query steps.
#[derive(Debug, Clone)]
pub enum QueryStep {
    /// Question classifier.
    Classifier(Classifier),
    /// Requirement gatherer.
    RequirementGatherer(RequirementGatherer),
    /// SQL generator.
    SqlGenerator(SqlGenerator),
    /// Result summarizer.
    Summarizer(Summarizer),
    /// SQL explainer.
    SqlExplainer(SqlExplainer),
}

impl QueryStep {
    /// The question-answering sequence.
    #[must_use]
    pub fn standard_sequence(
        model: Arc<dyn LanguageModel>,
        config: Arc<PipelineConfig>,
    ) -> Vec<Self> {
        vec![
            Self::Classifier(Classifier::new(model.clone(), config.clone())),
            Self::RequirementGatherer(RequirementGatherer::new(model.clone(), config.clone())),
            Self::SqlGenerator(SqlGenerator::new(model.clone(), config.clone())),
            Self::Summarizer(Summarizer::new(model, config)),
        ]
    }

    /// The single-step SQL explanation sequence.
    #[must_use]
    pub fn explain_sequence(model: Arc<dyn LanguageModel>, config: Arc<PipelineConfig>) -> Vec<Self> {
        vec![Self::SqlExplainer(SqlExplainer::new(model, config))]
    }

    fn inner(&self) -> &dyn PipelineStep {
        match self {
            Self::Classifier(step) => step,
            Self::RequirementGatherer(step) => step,
            Self::SqlGenerator(step) => step,
            Self::Summarizer(step) => step,
            Self::SqlExplainer(step) => step,
        }
    }
}

#[async_trait]
impl PipelineStep for QueryStep {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn step_type(&self) -> StepType {
        self.inner().step_type()
    }

    async fn run(&self, ctx: &StepContext<'_>) -> StepOutput {
        self.inner().run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedModel, StaticConnector, StaticContext};
    use crate::tools::ToolSet;

    #[test]
    fn test_standard_sequence_order() {
        let model: Arc<dyn LanguageModel> = Arc::new(ScriptedModel::new(Vec::new()));
        let steps = QueryStep::standard_sequence(model, Arc::new(PipelineConfig::default()));
        let types: Vec<_> = steps.iter().map(PipelineStep::step_type).collect();
        assert_eq!(
            types,
            vec![
                StepType::QuestionClassification,
                StepType::RequirementsExtraction,
                StepType::NaturalLanguageToSql,
                StepType::DataSummarization,
            ]
        );
    }

    #[tokio::test]
    async fn test_conversation_starts_with_instructions() {
        let context = StaticContext::new()
            .with_instructions("Answer briefly.")
            .with_history(vec![crate::context::ChatTurn::user("Hi")]);
        let tools = ToolSet::from_connections(Vec::new(), Arc::new(StaticConnector::new()));
        let state = PipelineState::new();
        let ctx = StepContext {
            query: "How many orders?",
            expert_id: "e1",
            thread_id: "t1",
            tools: &tools,
            context: &context,
            state: &state,
        };

        let messages = ctx.conversation(100).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0],
            ChatMessage::user(crate::context::render_user_instructions("Answer briefly."))
        );
        assert_eq!(messages[1], ChatMessage::user("Hi"));
    }

    #[test]
    fn test_require_missing_is_fatal() {
        let context = StaticContext::new();
        let tools = ToolSet::from_connections(Vec::new(), Arc::new(StaticConnector::new()));
        let state = PipelineState::new();
        let ctx = StepContext {
            query: "q",
            expert_id: "e1",
            thread_id: "t1",
            tools: &tools,
            context: &context,
            state: &state,
        };
        let err = ctx.require("requirement", "No requirement found").unwrap_err();
        assert_eq!(err, StepError::fatal("No requirement found"));
    }
}
