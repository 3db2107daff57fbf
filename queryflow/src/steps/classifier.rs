//! Question classifier.

use super::{PipelineStep, StepContext};
use crate::config::PipelineConfig;
use crate::core::{StatisticsRecorder, StepOutput, StepType};
use crate::llm::{ChatMessage, LanguageModel, LlmRequest};
use crate::parser::{parse_response, ClassificationResponse, StructuredResponse};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decides whether a question is about data analytics.
///
/// The classification is advisory: the step never halts the pipeline and
/// never fails. Unless `model_classification` is enabled it does not call
/// the model at all and passes the question through with empty data.
#[derive(Debug, Clone)]
pub struct Classifier {
    model: Arc<dyn LanguageModel>,
    config: Arc<PipelineConfig>,
}

impl Classifier {
    /// Creates a classifier.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, config: Arc<PipelineConfig>) -> Self {
        Self { model, config }
    }

    async fn classify(&self, ctx: &StepContext<'_>) -> StepOutput {
        let step_type = StepType::QuestionClassification;
        let mut recorder = StatisticsRecorder::start(self.model.info().clone());

        let request = LlmRequest::new(&self.config.prompts.classification)
            .messages(ctx.conversation(self.config.history_depth).await)
            .message(ChatMessage::user(ctx.query));

        let response = match self.model.invoke(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Classification call failed, passing question through");
                return StepOutput::proceed(step_type, Default::default())
                    .with_input(ctx.query_input());
            }
        };
        recorder.record(&response.usage);
        let statistics = recorder.finish(step_type);

        let data = match parse_response::<ClassificationResponse>(&response.content) {
            Ok(parsed) => {
                debug!(related = parsed.is_data_analytics_related, "Question classified");
                parsed.to_data()
            }
            Err(err) => {
                warn!(error = %err, "Unparseable classification, passing question through");
                Default::default()
            }
        };

        StepOutput::proceed(step_type, data)
            .with_input(ctx.query_input())
            .with_raw_data(response.content)
            .with_statistics(statistics)
    }
}

#[async_trait]
impl PipelineStep for Classifier {
    fn name(&self) -> &str {
        "classifier"
    }

    fn step_type(&self) -> StepType {
        StepType::QuestionClassification
    }

    async fn run(&self, ctx: &StepContext<'_>) -> StepOutput {
        if self.config.model_classification {
            return self.classify(ctx).await;
        }
        StepOutput::proceed(StepType::QuestionClassification, Default::default())
            .with_input(ctx.query_input())
    }
}
