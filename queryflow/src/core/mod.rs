//! Core domain model types for queryflow.
//!
//! This module contains the data carriers shared by every pipeline step:
//! - The step type tag
//! - The step output with its factory methods
//! - Per-step usage statistics

mod output;
#[cfg(test)]
mod output_tests;
mod statistics;
mod step_type;

pub use output::{StepData, StepOutcome, StepOutput};
pub use statistics::{StatisticsRecorder, StepStatistics};
pub use step_type::StepType;
