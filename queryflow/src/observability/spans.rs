//! Spans and timing for pipeline runs.

use crate::core::StepType;
use std::time::Instant;
use tracing::{info_span, Span};

/// Span wrapping a whole pipeline run.
#[must_use]
pub fn pipeline_span(pipeline: &str, thread_id: &str, expert_id: &str) -> Span {
    info_span!("pipeline", pipeline, thread_id, expert_id)
}

/// Span wrapping one step attempt.
#[must_use]
pub fn step_span(step: &str, step_type: StepType, attempt: usize) -> Span {
    info_span!("step", step, step_type = %step_type, attempt)
}

/// Wall-clock timer.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the timer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the timer and returns the duration in milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("summarizer");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(timer.name(), "summarizer");
        assert!(timer.finish() >= 10.0);
    }

    #[test]
    fn test_spans_build_without_subscriber() {
        let _pipeline = pipeline_span("query", "t1", "e1");
        let _step = step_span("classifier", StepType::QuestionClassification, 1);
    }
}
