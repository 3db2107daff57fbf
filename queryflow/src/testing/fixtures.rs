//! Test fixtures for step and pipeline testing.

use std::sync::Arc;

use super::{StaticConnector, StaticContext};
use crate::pipeline::PipelineState;
use crate::steps::StepContext;
use crate::tools::{ConnectionInfo, ToolSet};

/// The `sales_data` PostgreSQL connection bound as
/// `salesDataSchemaGetter` / `salesDataQueryExecutor`.
#[must_use]
pub fn sales_connection() -> ConnectionInfo {
    ConnectionInfo::new("conn-1", "sales_data", "sales_db", "postgresql")
        .with_instructions("Orders placed through the web shop")
}

/// The `hr` MySQL connection bound as `hrSchemaGetter` / `hrQueryExecutor`.
#[must_use]
pub fn hr_connection() -> ConnectionInfo {
    ConnectionInfo::new("conn-2", "hr", "hr_db", "mysql")
}

/// Owns everything a [`StepContext`] borrows.
#[derive(Debug)]
pub struct StepHarness {
    /// The question.
    pub query: String,
    /// Expert id.
    pub expert_id: String,
    /// Thread id.
    pub thread_id: String,
    /// Bound tools; empty by default.
    pub tools: ToolSet,
    /// Context provider.
    pub context: StaticContext,
    /// State seen by the step.
    pub state: PipelineState,
}

impl StepHarness {
    /// Creates a harness with no tools, default context and empty state.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            expert_id: "expert-1".to_string(),
            thread_id: "thread-1".to_string(),
            tools: ToolSet::from_connections(Vec::new(), Arc::new(StaticConnector::new())),
            context: StaticContext::new(),
            state: PipelineState::new(),
        }
    }

    /// Sets the tools.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the context provider.
    #[must_use]
    pub fn with_context(mut self, context: StaticContext) -> Self {
        self.context = context;
        self
    }

    /// Sets a state entry.
    #[must_use]
    pub fn with_state(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.state.insert(key, value);
        self
    }

    /// Borrows the harness as a step context.
    #[must_use]
    pub fn ctx(&self) -> StepContext<'_> {
        StepContext {
            query: &self.query,
            expert_id: &self.expert_id,
            thread_id: &self.thread_id,
            tools: &self.tools,
            context: &self.context,
            state: &self.state,
        }
    }
}
