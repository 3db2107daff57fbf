//! Sequential step execution with bounded retries.

use super::{PipelineResult, PipelineState, RetryBudget, RetryDecision};
use crate::config::PipelineConfig;
use crate::context::ContextProvider;
use crate::core::StepData;
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::llm::LanguageModel;
use crate::observability::{pipeline_span, step_span, SpanTimer};
use crate::steps::{PipelineStep, QueryStep, StepContext};
use crate::tools::ToolSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Inputs of one run.
#[derive(Clone, Copy)]
pub struct RunRequest<'a> {
    /// The user's question.
    pub query: &'a str,
    /// The expert (tenant).
    pub expert_id: &'a str,
    /// The conversation thread.
    pub thread_id: &'a str,
    /// Tools bound for this run.
    pub tools: &'a ToolSet,
    /// Instructions and chat history.
    pub context: &'a dyn ContextProvider,
}

impl fmt::Debug for RunRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRequest")
            .field("query", &self.query)
            .field("expert_id", &self.expert_id)
            .field("thread_id", &self.thread_id)
            .finish_non_exhaustive()
    }
}

/// Drives an ordered sequence of steps over a shared state.
///
/// Each step runs once unless it fails with a retryable error, in which
/// case it runs again until it succeeds, fails fatally or spends the retry
/// budget carried by its first error. Successful data is merged into the
/// state with last-write-wins semantics. The run stops after a terminal
/// output, after a failure, or after the last step.
#[derive(Clone)]
pub struct QueryPipeline {
    name: String,
    steps: Vec<Arc<dyn PipelineStep>>,
    event_sink: Arc<dyn EventSink>,
}

impl fmt::Debug for QueryPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPipeline")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .finish_non_exhaustive()
    }
}

impl QueryPipeline {
    /// Creates a pipeline over `steps`.
    #[must_use]
    pub fn new(name: impl Into<String>, steps: Vec<Arc<dyn PipelineStep>>) -> Self {
        Self {
            name: name.into(),
            steps,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Classifier, requirement gatherer, SQL generator and summarizer.
    #[must_use]
    pub fn standard(model: Arc<dyn LanguageModel>, config: Arc<PipelineConfig>) -> Self {
        Self::from_steps("query", QueryStep::standard_sequence(model, config))
    }

    /// The SQL explainer alone.
    #[must_use]
    pub fn explain(model: Arc<dyn LanguageModel>, config: Arc<PipelineConfig>) -> Self {
        Self::from_steps("explain", QueryStep::explain_sequence(model, config))
    }

    fn from_steps(name: &str, steps: Vec<QueryStep>) -> Self {
        Self::new(
            name,
            steps
                .into_iter()
                .map(|step| Arc::new(step) as Arc<dyn PipelineStep>)
                .collect(),
        )
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the step names in order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs the steps over a state seeded with `seed`.
    pub async fn run(&self, request: RunRequest<'_>, seed: StepData) -> PipelineResult {
        let span = pipeline_span(&self.name, request.thread_id, request.expert_id);
        self.run_steps(request, seed).instrument(span).await
    }

    async fn run_steps(&self, request: RunRequest<'_>, seed: StepData) -> PipelineResult {
        let timer = SpanTimer::start(&self.name);
        let mut state = PipelineState::from(seed);
        let mut result = PipelineResult::empty();

        self.event_sink
            .emit(&PipelineEvent::PipelineStarted {
                pipeline: self.name.clone(),
                thread_id: request.thread_id.to_string(),
                steps: self.steps.len(),
            })
            .await;
        info!(steps = self.steps.len(), "Pipeline started");

        'steps: for step in &self.steps {
            let mut budget = RetryBudget::new();
            loop {
                let attempt = budget.begin_attempt();
                self.event_sink
                    .emit(&PipelineEvent::StepStarted {
                        step: step.name().to_string(),
                        step_type: step.step_type(),
                        attempt,
                    })
                    .await;

                let step_timer = SpanTimer::start(step.name());
                let output = {
                    let ctx = StepContext {
                        query: request.query,
                        expert_id: request.expert_id,
                        thread_id: request.thread_id,
                        tools: request.tools,
                        context: request.context,
                        state: &state,
                    };
                    step.run(&ctx)
                        .instrument(step_span(step.name(), step.step_type(), attempt))
                        .await
                };
                let duration_ms = step_timer.finish();

                if let Some(reply) = output.reply_text() {
                    result.reply = Some(reply.to_string());
                }
                if let Some(statistics) = &output.statistics {
                    result.statistics.push(statistics.clone());
                }

                match output.error.clone() {
                    None => {
                        state.merge(&output.data);
                        let terminal = output.terminal;
                        debug!(step = step.name(), terminal, duration_ms, "Step completed");
                        self.event_sink
                            .emit(&PipelineEvent::StepCompleted {
                                step: step.name().to_string(),
                                step_type: step.step_type(),
                                terminal,
                                duration_ms,
                            })
                            .await;
                        result.steps.push(output);
                        if terminal {
                            break 'steps;
                        }
                        continue 'steps;
                    }
                    Some(error) => {
                        result.steps.push(output);
                        match budget.on_failure(&error) {
                            RetryDecision::Retry { remaining } => {
                                warn!(
                                    step = step.name(),
                                    attempt,
                                    remaining,
                                    error = %error,
                                    "Retrying step"
                                );
                                self.event_sink
                                    .emit(&PipelineEvent::StepRetrying {
                                        step: step.name().to_string(),
                                        step_type: step.step_type(),
                                        attempt,
                                        remaining,
                                        error: error.to_string(),
                                    })
                                    .await;
                            }
                            RetryDecision::GiveUp | RetryDecision::NotRetryable => {
                                warn!(step = step.name(), attempt, error = %error, "Step failed");
                                self.event_sink
                                    .emit(&PipelineEvent::StepFailed {
                                        step: step.name().to_string(),
                                        step_type: step.step_type(),
                                        error: error.to_string(),
                                        retryable: error.is_retryable(),
                                    })
                                    .await;
                                result.is_complete = false;
                                result.error = Some(error);
                                break 'steps;
                            }
                        }
                    }
                }
            }
        }

        result.state = state.into_map();
        result.duration_ms = timer.finish();
        self.event_sink
            .emit(&PipelineEvent::PipelineCompleted {
                pipeline: self.name.clone(),
                is_complete: result.is_complete,
                steps: result.steps.len(),
                duration_ms: result.duration_ms,
            })
            .await;
        info!(
            is_complete = result.is_complete,
            executions = result.steps.len(),
            "Pipeline completed"
        );
        result
    }
}
