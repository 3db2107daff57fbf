//! Step output type with factory methods.

use super::{StepStatistics, StepType};
use crate::errors::StepError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// String-keyed payload produced or consumed by a step.
pub type StepData = HashMap<String, serde_json::Value>;

/// How the orchestrator should proceed after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Merge the data and run the next step.
    Continue,
    /// Merge the data and stop.
    Terminal,
    /// Re-run the same step; carries the retry budget.
    Retry(usize),
    /// Stop with an error.
    Fatal,
}

/// The output of one step execution.
///
/// `StepOutput` is immutable once returned to the orchestrator. The
/// factory methods cover the three shapes a step produces: continue,
/// finish, and fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    /// The stage that produced this output.
    pub step_type: StepType,

    /// Data merged into the shared pipeline state on success.
    #[serde(default)]
    pub data: StepData,

    /// The subset of state this step consumed.
    #[serde(default)]
    pub input: StepData,

    /// Unparsed model response text.
    #[serde(default)]
    pub raw_data: String,

    /// Failure descriptor; `None` means success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,

    /// Whether the pipeline must stop after this step.
    pub terminal: bool,

    /// Model usage for this execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<StepStatistics>,

    /// Diagnostics that are not merged into the pipeline state.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StepOutput {
    fn base(step_type: StepType, data: StepData, terminal: bool) -> Self {
        Self {
            step_type,
            data,
            input: StepData::new(),
            raw_data: String::new(),
            error: None,
            terminal,
            statistics: None,
            metadata: HashMap::new(),
        }
    }

    /// Creates a successful output that lets the pipeline continue.
    #[must_use]
    pub fn proceed(step_type: StepType, data: StepData) -> Self {
        Self::base(step_type, data, false)
    }

    /// Creates a successful output that stops the pipeline.
    #[must_use]
    pub fn finish(step_type: StepType, data: StepData) -> Self {
        Self::base(step_type, data, true)
    }

    /// Creates a failed output. Failed outputs are always terminal.
    #[must_use]
    pub fn fail(step_type: StepType, error: StepError) -> Self {
        let mut output = Self::base(step_type, StepData::new(), true);
        output.error = Some(error);
        output
    }

    /// Creates a fatal failure.
    #[must_use]
    pub fn fatal(step_type: StepType, message: impl Into<String>) -> Self {
        Self::fail(step_type, StepError::fatal(message))
    }

    /// Creates a retryable failure with the default budget.
    #[must_use]
    pub fn retryable(step_type: StepType, message: impl Into<String>) -> Self {
        Self::fail(step_type, StepError::retryable(message))
    }

    /// Sets the consumed input.
    #[must_use]
    pub fn with_input(mut self, input: StepData) -> Self {
        self.input = input;
        self
    }

    /// Adds a single input entry.
    #[must_use]
    pub fn add_input(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.input.insert(key.into(), value);
        self
    }

    /// Sets the data (replaces existing data).
    #[must_use]
    pub fn with_data(mut self, data: StepData) -> Self {
        self.data = data;
        self
    }

    /// Sets the raw model response.
    #[must_use]
    pub fn with_raw_data(mut self, raw_data: impl Into<String>) -> Self {
        self.raw_data = raw_data.into();
        self
    }

    /// Attaches usage statistics.
    #[must_use]
    pub fn with_statistics(mut self, statistics: StepStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    /// Attaches usage statistics if present.
    #[must_use]
    pub fn with_optional_statistics(mut self, statistics: Option<StepStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn add_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true if the output carries no error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if the output carries a retryable error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.error.as_ref().is_some_and(StepError::is_retryable)
    }

    /// Classifies the output for the orchestrator's transition logic.
    #[must_use]
    pub fn outcome(&self) -> StepOutcome {
        match &self.error {
            Some(err) if err.is_retryable() => StepOutcome::Retry(err.retry_count()),
            Some(_) => StepOutcome::Fatal,
            None if self.terminal => StepOutcome::Terminal,
            None => StepOutcome::Continue,
        }
    }

    /// Gets a value from the data.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a non-empty string value from the data.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Returns the user-facing text of this output, preferring the summary.
    #[must_use]
    pub fn reply_text(&self) -> Option<&str> {
        self.get_str("reply")?;
        self.get_str("data_summary").or_else(|| self.get_str("reply"))
    }
}
