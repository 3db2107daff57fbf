//! Test assertions for step outputs and pipeline results.

use crate::core::{StepOutcome, StepOutput};
use crate::pipeline::PipelineResult;

/// Asserts that the output carries no error.
pub fn assert_output_succeeded(output: &StepOutput) {
    assert!(
        output.is_success(),
        "Expected success, got error: {:?}",
        output.error
    );
}

/// Asserts that the output carries an error with the given message.
pub fn assert_output_failed(output: &StepOutput, message: &str) {
    let actual = output.error.as_ref().map(|e| e.message());
    assert_eq!(
        actual,
        Some(message),
        "Expected failure '{message}', got {actual:?}"
    );
}

/// Asserts the orchestrator's classification of the output.
pub fn assert_outcome(output: &StepOutput, expected: StepOutcome) {
    assert_eq!(
        output.outcome(),
        expected,
        "Expected outcome {:?}, got {:?}",
        expected,
        output.outcome()
    );
}

/// Asserts that the output data holds `expected` under `key`.
pub fn assert_output_value(output: &StepOutput, key: &str, expected: &serde_json::Value) {
    let actual = output.get(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected value {expected:?} for key '{key}', got {actual:?}. Keys: {:?}",
        output.data.keys().collect::<Vec<_>>()
    );
}

/// Asserts the step types of a result's trace, in order.
pub fn assert_trace(result: &PipelineResult, expected: &[crate::core::StepType]) {
    let actual: Vec<_> = result.steps.iter().map(|s| s.step_type).collect();
    assert_eq!(actual, expected, "Unexpected step trace");
}
