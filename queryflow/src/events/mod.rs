//! Pipeline events for observability.
//!
//! The orchestrator reports its progress to an injected [`EventSink`]. Sinks
//! must never fail the run: they log, collect or discard.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::core::StepType;
use crate::utils::iso_timestamp;
use serde::Serialize;

/// Progress of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PipelineEvent {
    /// A run began.
    PipelineStarted {
        /// Pipeline name.
        pipeline: String,
        /// Conversation thread.
        thread_id: String,
        /// Number of steps in the sequence.
        steps: usize,
    },
    /// A step attempt began.
    StepStarted {
        /// Step name.
        step: String,
        /// Step tag.
        step_type: StepType,
        /// 1-based attempt number.
        attempt: usize,
    },
    /// A step succeeded.
    StepCompleted {
        /// Step name.
        step: String,
        /// Step tag.
        step_type: StepType,
        /// Whether the step ended the run.
        terminal: bool,
        /// Attempt duration.
        duration_ms: f64,
    },
    /// A step failed with a retryable error and will run again.
    StepRetrying {
        /// Step name.
        step: String,
        /// Step tag.
        step_type: StepType,
        /// The attempt that failed.
        attempt: usize,
        /// Retries left after this one.
        remaining: usize,
        /// The failure.
        error: String,
    },
    /// A step failed for good.
    StepFailed {
        /// Step name.
        step: String,
        /// Step tag.
        step_type: StepType,
        /// The failure.
        error: String,
        /// Whether the error was retryable (and the budget ran out).
        retryable: bool,
    },
    /// A run ended.
    PipelineCompleted {
        /// Pipeline name.
        pipeline: String,
        /// Whether the run ended without error.
        is_complete: bool,
        /// Step executions in the trace.
        steps: usize,
        /// Run duration.
        duration_ms: f64,
    },
}

impl PipelineEvent {
    /// Returns the dotted event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PipelineStarted { .. } => "pipeline.started",
            Self::StepStarted { .. } => "step.started",
            Self::StepCompleted { .. } => "step.completed",
            Self::StepRetrying { .. } => "step.retrying",
            Self::StepFailed { .. } => "step.failed",
            Self::PipelineCompleted { .. } => "pipeline.completed",
        }
    }

    /// Returns the event fields as JSON, stamped with the event name and
    /// the emission time.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        let mut payload = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(fields) = payload.as_object_mut() {
            fields.insert("event".to_string(), self.name().into());
            fields.insert("timestamp".to_string(), iso_timestamp().into());
        }
        payload
    }
}
