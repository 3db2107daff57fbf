//! Scripted collaborators for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::context::{
    effective_depth, render_user_instructions, ChatTurn, ContextProvider, DEFAULT_INSTRUCTIONS,
};
use crate::core::{StepData, StepOutput, StepType};
use crate::errors::{LlmError, LlmResult};
use crate::llm::{LanguageModel, LlmRequest, LlmResponse, ModelInfo};
use crate::steps::{PipelineStep, StepContext};
use crate::tools::{ConnectionInfo, DatabaseConnector, QueryRows};

/// A model that answers from a script and records every request.
///
/// Once the script is exhausted every call fails with a transport error.
#[derive(Debug)]
pub struct ScriptedModel {
    info: ModelInfo,
    responses: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedModel {
    /// Creates a model that returns `responses` in order.
    #[must_use]
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            info: ModelInfo::new("scripted", "scripted-model"),
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Appends a failing call to the script.
    #[must_use]
    pub fn then_error(self, error: LlmError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Returns the requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn invoke(&self, request: &LlmRequest) -> LlmResult<LlmResponse> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Transport("script exhausted".to_string())))
    }
}

/// A connector with fixed schemas and a queue of query results.
///
/// `execute` and `execute_paged` share the queue. An empty queue yields an
/// empty result set.
#[derive(Debug, Default)]
pub struct StaticConnector {
    schemas: HashMap<String, String>,
    results: Mutex<VecDeque<Result<QueryRows, String>>>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl StaticConnector {
    /// Creates a connector without schemas or results.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the schema description of a connection.
    #[must_use]
    pub fn with_schema(
        mut self,
        connection_id: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        self.schemas.insert(connection_id.into(), schema.into());
        self
    }

    /// Queues the result of the next query.
    #[must_use]
    pub fn with_result(self, result: Result<QueryRows, String>) -> Self {
        self.results.lock().push_back(result);
        self
    }

    /// Shared handle on the SQL statements received so far.
    #[must_use]
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        self.executed.clone()
    }

    fn next(&self, sql: &str) -> Result<QueryRows, String> {
        self.executed.lock().push(sql.to_string());
        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryRows::default()))
    }
}

#[async_trait]
impl DatabaseConnector for StaticConnector {
    async fn describe_schema(&self, connection: &ConnectionInfo) -> Result<String, String> {
        self.schemas
            .get(&connection.connection_id)
            .cloned()
            .ok_or_else(|| format!("no schema for {}", connection.connection_id))
    }

    async fn execute(&self, _connection: &ConnectionInfo, sql: &str) -> Result<QueryRows, String> {
        self.next(sql)
    }

    async fn execute_paged(
        &self,
        _connection: &ConnectionInfo,
        sql: &str,
        _page: usize,
        page_size: usize,
    ) -> Result<QueryRows, String> {
        self.next(sql).map(|rows| rows.truncated(page_size))
    }
}

/// A context provider with fixed instructions and history.
///
/// `chat_history` returns the last `depth` turns.
#[derive(Debug, Clone)]
pub struct StaticContext {
    instructions: String,
    history: Vec<ChatTurn>,
}

impl Default for StaticContext {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            history: Vec::new(),
        }
    }
}

impl StaticContext {
    /// Creates a provider with default instructions and no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Sets the history.
    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }
}

#[async_trait]
impl ContextProvider for StaticContext {
    fn user_instructions(&self) -> String {
        render_user_instructions(&self.instructions)
    }

    async fn chat_history(&self, _thread_id: &str, depth: i64) -> Vec<ChatTurn> {
        let keep = effective_depth(depth).min(self.history.len());
        self.history[self.history.len() - keep..].to_vec()
    }
}

/// A step that replays scripted outputs and records the state it saw.
///
/// The last scripted output repeats once the others are used up.
#[derive(Debug)]
pub struct ScriptedStep {
    name: String,
    step_type: StepType,
    outputs: Mutex<VecDeque<StepOutput>>,
    seen: Mutex<Vec<StepData>>,
}

impl ScriptedStep {
    /// Creates a step returning `outputs` in order.
    #[must_use]
    pub fn new(name: impl Into<String>, step_type: StepType, outputs: Vec<StepOutput>) -> Self {
        Self {
            name: name.into(),
            step_type,
            outputs: Mutex::new(outputs.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Creates a step that always returns `output`.
    #[must_use]
    pub fn always(name: impl Into<String>, output: StepOutput) -> Self {
        let step_type = output.step_type;
        Self::new(name, step_type, vec![output])
    }

    /// Returns the number of runs.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }

    /// Returns the state observed on each run.
    #[must_use]
    pub fn seen_states(&self) -> Vec<StepData> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl PipelineStep for ScriptedStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn step_type(&self) -> StepType {
        self.step_type
    }

    async fn run(&self, ctx: &StepContext<'_>) -> StepOutput {
        self.seen.lock().push(ctx.state.as_map().clone());
        let mut outputs = self.outputs.lock();
        if outputs.len() > 1 {
            if let Some(output) = outputs.pop_front() {
                return output;
            }
        }
        outputs
            .front()
            .cloned()
            .unwrap_or_else(|| StepOutput::fatal(self.step_type, "no scripted output"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_exhausts() {
        let model = ScriptedModel::new(vec![LlmResponse::text("one")]);
        let request = LlmRequest::new("sys");
        assert_eq!(model.invoke(&request).await.unwrap().content, "one");
        assert!(model.invoke(&request).await.is_err());
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_static_context_keeps_last_turns() {
        let context = StaticContext::new().with_history(vec![
            ChatTurn::user("a"),
            ChatTurn::ai("b"),
            ChatTurn::user("c"),
        ]);
        assert_eq!(
            context.chat_history("t", 2).await,
            vec![ChatTurn::ai("b"), ChatTurn::user("c")]
        );
        assert_eq!(context.chat_history("t", 0).await.len(), 3);
    }
}
