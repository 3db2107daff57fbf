//! Testing utilities for queryflow pipelines.
//!
//! This module provides:
//! - Scripted model, connector, context and step collaborators
//! - A harness owning everything a step borrows
//! - Assertions for step outputs and pipeline results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_outcome, assert_output_failed, assert_output_succeeded, assert_output_value,
    assert_trace,
};
pub use fixtures::{hr_connection, sales_connection, StepHarness};
pub use mocks::{ScriptedModel, ScriptedStep, StaticConnector, StaticContext};
