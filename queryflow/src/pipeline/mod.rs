//! Pipeline execution.
//!
//! This module provides:
//! - The shared pipeline state
//! - The sequential orchestrator with bounded retries
//! - The run result with its full trace

mod orchestrator;
mod result;
mod retry;
mod state;


pub use orchestrator::{QueryPipeline, RunRequest};
pub use result::PipelineResult;
pub use retry::{RetryBudget, RetryDecision};
pub use state::PipelineState;
