//! Retry bookkeeping for a single step.
//!
//! The budget is fixed by the first retryable error of a step and counts
//! down on each further retryable failure. There is no backoff: a retry
//! re-runs the step immediately.

use crate::errors::StepError;

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run the step again; `remaining` retries are left afterwards.
    Retry {
        /// Retries left after this one.
        remaining: usize,
    },
    /// The budget is spent, give up.
    GiveUp,
    /// Don't retry, the error is not retryable.
    NotRetryable,
}

/// Retry state of one step.
#[derive(Debug, Clone, Default)]
pub struct RetryBudget {
    attempts: usize,
    remaining: Option<usize>,
}

impl RetryBudget {
    /// Creates the state before the first attempt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of an attempt and returns its 1-based number.
    pub fn begin_attempt(&mut self) -> usize {
        self.attempts += 1;
        self.attempts
    }

    /// Returns the number of attempts started.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Decides what to do about a failed attempt.
    pub fn on_failure(&mut self, error: &StepError) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::NotRetryable;
        }
        let remaining = self.remaining.get_or_insert(error.retry_count());
        if *remaining == 0 {
            return RetryDecision::GiveUp;
        }
        *remaining -= 1;
        RetryDecision::Retry {
            remaining: *remaining,
        }
    }
}
