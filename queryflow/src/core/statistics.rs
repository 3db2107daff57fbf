//! Usage statistics for a single step execution.

use super::StepType;
use crate::llm::{ModelInfo, Usage};
use crate::utils::epoch_seconds;
use serde::{Deserialize, Serialize};

/// Model usage recorded for one step execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStatistics {
    /// The model that served the step.
    pub model_name: String,
    /// Provider details (provider name, endpoint, ...).
    pub client_info: serde_json::Value,
    /// Tokens produced by the model.
    pub completion_tokens: u64,
    /// Tokens sent to the model.
    pub prompt_tokens: u64,
    /// Wall-clock start, seconds since the Unix epoch.
    pub call_start_time: f64,
    /// Wall-clock end, seconds since the Unix epoch.
    pub call_end_time: f64,
    /// Whether the model streamed its output.
    pub is_streaming_output: bool,
    /// The step that recorded these statistics.
    pub step_type: StepType,
}

impl StepStatistics {
    /// Returns prompt plus completion tokens.
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Returns the call duration in seconds.
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        (self.call_end_time - self.call_start_time).max(0.0)
    }
}

/// Accumulates token usage across one or more model calls of a step.
#[derive(Debug, Clone)]
pub struct StatisticsRecorder {
    model: ModelInfo,
    started_at: f64,
    prompt_tokens: u64,
    completion_tokens: u64,
    calls: usize,
}

impl StatisticsRecorder {
    /// Starts recording now.
    #[must_use]
    pub fn start(model: ModelInfo) -> Self {
        Self {
            model,
            started_at: epoch_seconds(),
            prompt_tokens: 0,
            completion_tokens: 0,
            calls: 0,
        }
    }

    /// Adds the usage of one model call.
    pub fn record(&mut self, usage: &Usage) {
        self.prompt_tokens += usage.input_tokens;
        self.completion_tokens += usage.output_tokens;
        self.calls += 1;
    }

    /// Returns the number of recorded calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Closes the recording window and produces the statistics record.
    #[must_use]
    pub fn finish(&self, step_type: StepType) -> StepStatistics {
        StepStatistics {
            model_name: self.model.model.clone(),
            client_info: self.model.client_info(),
            completion_tokens: self.completion_tokens,
            prompt_tokens: self.prompt_tokens,
            call_start_time: self.started_at,
            call_end_time: epoch_seconds().max(self.started_at),
            is_streaming_output: self.model.streaming,
            step_type,
        }
    }
}
