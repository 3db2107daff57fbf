//! Outcome of a pipeline run.

use crate::core::{StepData, StepOutput, StepStatistics, StepType};
use crate::errors::StepError;
use serde::{Serialize, Serializer};

/// The reply, trace and statistics of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    /// Best reply computed so far; a step's `data_summary` wins over its
    /// `reply`, later steps win over earlier ones.
    pub reply: Option<String>,
    /// Every step execution in order, failed attempts included.
    pub steps: Vec<StepOutput>,
    /// Statistics of every execution that recorded any.
    pub statistics: Vec<StepStatistics>,
    /// True when the run ended without error.
    pub is_complete: bool,
    /// The error that halted the run.
    #[serde(serialize_with = "error_as_string")]
    pub error: Option<StepError>,
    /// Pipeline state after the last successful step.
    pub state: StepData,
    /// Run duration in milliseconds.
    pub duration_ms: f64,
}

fn error_as_string<S: Serializer>(
    error: &Option<StepError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(err.message()),
        None => serializer.serialize_none(),
    }
}

impl PipelineResult {
    pub(crate) fn empty() -> Self {
        Self {
            reply: None,
            steps: Vec::new(),
            statistics: Vec::new(),
            is_complete: true,
            error: None,
            state: StepData::new(),
            duration_ms: 0.0,
        }
    }

    /// Returns the last step execution.
    #[must_use]
    pub fn last_output(&self) -> Option<&StepOutput> {
        self.steps.last()
    }

    /// Returns the executions of one step type.
    pub fn outputs_of(&self, step_type: StepType) -> impl Iterator<Item = &StepOutput> {
        self.steps.iter().filter(move |s| s.step_type == step_type)
    }

    /// Returns true if any execution of `step_type` is in the trace.
    #[must_use]
    pub fn ran(&self, step_type: StepType) -> bool {
        self.outputs_of(step_type).next().is_some()
    }

    /// Sums prompt and completion tokens over all statistics.
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.statistics.iter().map(StepStatistics::total_tokens).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialized_as_string() {
        let mut result = PipelineResult::empty();
        result.is_complete = false;
        result.error = Some(StepError::fatal("No requirement found"));
        result.steps.push(StepOutput::fatal(
            StepType::NaturalLanguageToSql,
            "No requirement found",
        ));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["error"], "No requirement found");
        assert_eq!(json["is_complete"], false);
        assert_eq!(json["steps"][0]["step_type"], "natural_language_to_sql");
    }

    #[test]
    fn test_trace_queries() {
        let mut result = PipelineResult::empty();
        result.steps.push(StepOutput::retryable(StepType::RequirementsExtraction, "x"));
        result.steps.push(StepOutput::finish(StepType::RequirementsExtraction, StepData::new()));

        assert_eq!(result.outputs_of(StepType::RequirementsExtraction).count(), 2);
        assert!(!result.ran(StepType::DataSummarization));
        assert!(result.last_output().unwrap().terminal);
        assert!(result.error.is_none());
        assert_eq!(serde_json::to_value(&result).unwrap()["error"], serde_json::Value::Null);
    }
}
