//! The query service: records a question, runs a pipeline over it, and
//! persists the trace.

use crate::config::PipelineConfig;
use crate::context::StoreBackedContext;
use crate::core::StepData;
use crate::errors::QueryflowError;
use crate::events::{EventSink, NoOpEventSink};
use crate::llm::LanguageModel;
use crate::pipeline::{PipelineResult, QueryPipeline, RunRequest};
use crate::store::PipelineStore;
use crate::tools::{ConnectionInfo, DatabaseConnector, ToolSet};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A question submitted to an expert.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// The question.
    pub query: String,
    /// The asking user.
    pub user_id: String,
    /// The expert answering.
    pub expert_id: String,
    /// Existing thread to continue; a new one is created when `None`.
    pub thread_id: Option<String>,
    /// Connections the expert may query.
    pub connections: Vec<ConnectionInfo>,
    /// User instructions overriding the default.
    pub instructions: Option<String>,
}

impl QueryRequest {
    /// Creates a request for a new thread.
    #[must_use]
    pub fn new(
        query: impl Into<String>,
        user_id: impl Into<String>,
        expert_id: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            user_id: user_id.into(),
            expert_id: expert_id.into(),
            ..Self::default()
        }
    }

    /// Continues an existing thread.
    #[must_use]
    pub fn in_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Adds a connection.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionInfo) -> Self {
        self.connections.push(connection);
        self
    }

    /// Sets the user instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// The stored ids and the pipeline outcome of one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    /// Thread the message belongs to.
    pub thread_id: String,
    /// The recorded message.
    pub message_id: String,
    /// The run.
    pub result: PipelineResult,
}

/// Answers questions for experts by running pipelines and persisting the
/// step outputs.
///
/// A step output the store refuses is logged and skipped; the caller still
/// gets the full result.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn PipelineStore>,
    model: Arc<dyn LanguageModel>,
    connector: Arc<dyn DatabaseConnector>,
    config: Arc<PipelineConfig>,
    event_sink: Arc<dyn EventSink>,
}

impl fmt::Debug for QueryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryService")
            .field("model", self.model.info())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QueryService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        store: Arc<dyn PipelineStore>,
        model: Arc<dyn LanguageModel>,
        connector: Arc<dyn DatabaseConnector>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            model,
            connector,
            config: Arc::new(config),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink handed to every pipeline.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Runs the standard pipeline over a question.
    pub async fn ask(&self, request: QueryRequest) -> Result<QueryResponse, QueryflowError> {
        let pipeline = QueryPipeline::standard(self.model.clone(), self.config.clone())
            .with_event_sink(self.event_sink.clone());
        self.run(&pipeline, request, StepData::new()).await
    }

    /// Explains the SQL in the question against the schema behind
    /// `schema_tool_name`.
    pub async fn explain(
        &self,
        request: QueryRequest,
        schema_tool_name: &str,
    ) -> Result<QueryResponse, QueryflowError> {
        let pipeline = QueryPipeline::explain(self.model.clone(), self.config.clone())
            .with_event_sink(self.event_sink.clone());
        let mut seed = StepData::new();
        seed.insert("schema_tool_name".to_string(), json!(schema_tool_name));
        seed.insert("requirement".to_string(), json!(request.query.trim()));
        self.run(&pipeline, request, seed).await
    }

    async fn run(
        &self,
        pipeline: &QueryPipeline,
        request: QueryRequest,
        mut seed: StepData,
    ) -> Result<QueryResponse, QueryflowError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(QueryflowError::EmptyQuery);
        }

        let thread_id = match &request.thread_id {
            Some(id) => self.store.get_thread(id).await?.id,
            None => {
                self.store
                    .create_thread(&request.user_id, &request.expert_id, None)
                    .await?
                    .id
            }
        };
        let message = self
            .store
            .create_message(&thread_id, &request.user_id, query)
            .await?;
        info!(%thread_id, message_id = %message.id, pipeline = pipeline.name(), "Answering query");

        let tools = ToolSet::from_connections(request.connections, self.connector.clone());
        let mut context = StoreBackedContext::new(self.store.clone());
        if let Some(instructions) = request.instructions {
            context = context.with_instructions(instructions);
        }

        seed.insert("user_id".to_string(), json!(request.user_id));
        seed.insert("message_id".to_string(), json!(message.id));

        let result = pipeline
            .run(
                RunRequest {
                    query,
                    expert_id: &request.expert_id,
                    thread_id: &thread_id,
                    tools: &tools,
                    context: &context,
                },
                seed,
            )
            .await;

        for (index, output) in result.steps.iter().enumerate() {
            if let Err(err) = self
                .store
                .append_step_output(&message.id, &request.user_id, output)
                .await
            {
                error!(
                    message_id = %message.id,
                    step_type = %output.step_type,
                    index,
                    error = %err,
                    "Failed to persist step output"
                );
            }
        }
        if let Some(error) = &result.error {
            warn!(%thread_id, message_id = %message.id, %error, "Query ended with an error");
        }

        Ok(QueryResponse {
            thread_id,
            message_id: message.id,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextProvider;
    use crate::core::{StepOutput, StepType};
    use crate::errors::{StoreError, StoreResult};
    use crate::llm::{LlmResponse, Usage};
    use crate::store::{
        InMemoryPipelineStore, MessageRecord, StatisticsRecord, StepOutputRecord, ThreadRecord,
    };
    use crate::testing::{sales_connection, ScriptedModel, StaticConnector};
    use pretty_assertions::assert_eq;

    const GREETING: &str = "```yaml
reply: Hello! Ask me anything about your sales data.
schema_tool_name:
requirement:
is_requirement_clear: false
is_already_answered_without_further_queries: false
```";

    fn service(store: &Arc<InMemoryPipelineStore>, model: &Arc<ScriptedModel>) -> QueryService {
        QueryService::new(
            store.clone(),
            model.clone(),
            Arc::new(StaticConnector::new().with_schema("conn-1", "orders(id int)")),
            PipelineConfig::default(),
        )
    }

    fn request(query: &str) -> QueryRequest {
        QueryRequest::new(query, "user-1", "expert-1").with_connection(sales_connection())
    }

    #[tokio::test]
    async fn test_rejects_empty_query() {
        let store = Arc::new(InMemoryPipelineStore::new());
        let model = Arc::new(ScriptedModel::new(Vec::new()));

        let err = service(&store, &model).ask(request("   ")).await.unwrap_err();

        assert!(matches!(err, QueryflowError::EmptyQuery));
        assert_eq!(model.call_count(), 0);
        assert_eq!(store.output_count(), 0);
    }

    #[tokio::test]
    async fn test_persists_every_step_output() {
        let store = Arc::new(InMemoryPipelineStore::new());
        let model = Arc::new(ScriptedModel::new(vec![
            LlmResponse::text(GREETING).with_usage(Usage::new(50, 10))
        ]));

        let response = service(&store, &model).ask(request("Hello")).await.unwrap();

        assert!(response.result.is_complete);
        assert_eq!(store.output_count(), 2);
        assert_eq!(store.statistics_count(), 1);

        let records = store.step_outputs(&response.message_id).await.unwrap();
        assert_eq!(records[0].output.step_type, StepType::QuestionClassification);
        assert_eq!(records[1].output.step_type, StepType::RequirementsExtraction);
        assert!(records.iter().all(|r| r.user_id == "user-1"));
        assert_eq!(response.result.state.get("user_id"), Some(&json!("user-1")));
        assert_eq!(
            response.result.state.get("message_id"),
            Some(&json!(response.message_id))
        );
    }

    #[tokio::test]
    async fn test_follow_up_sees_previous_turn() {
        let store = Arc::new(InMemoryPipelineStore::new());
        let model = Arc::new(ScriptedModel::new(vec![
            LlmResponse::text(GREETING),
            LlmResponse::text(GREETING),
        ]));
        let service = service(&store, &model);

        let first = service.ask(request("Hello")).await.unwrap();
        service
            .ask(request("And again").in_thread(&first.thread_id))
            .await
            .unwrap();

        let context = StoreBackedContext::new(store.clone());
        let history = context.chat_history(&first.thread_id, 0).await;
        assert_eq!(history.len(), 4);

        let second_request = &model.requests()[1];
        assert!(second_request
            .messages
            .iter()
            .any(|m| m == &crate::llm::ChatMessage::user("Hello")));
    }

    #[tokio::test]
    async fn test_unknown_thread_is_an_error() {
        let store = Arc::new(InMemoryPipelineStore::new());
        let model = Arc::new(ScriptedModel::new(Vec::new()));

        let err = service(&store, &model)
            .ask(request("Hello").in_thread("missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, QueryflowError::Store(StoreError::ThreadNotFound(_))));
    }

    #[tokio::test]
    async fn test_explain_seeds_schema_and_requirement() {
        let store = Arc::new(InMemoryPipelineStore::new());
        let model = Arc::new(ScriptedModel::new(vec![LlmResponse::text(
            "```yaml\nreply: Sure.\nexplanation: Counts orders.\n```",
        )]));

        let response = service(&store, &model)
            .explain(request("SELECT count(*) FROM orders"), "salesDataSchemaGetter")
            .await
            .unwrap();

        assert!(response.result.is_complete);
        assert_eq!(
            response.result.state.get("explanation"),
            Some(&json!("Counts orders."))
        );
        assert_eq!(store.output_count(), 1);
    }

    /// Accepts threads and messages but refuses every step output.
    #[derive(Debug, Default)]
    struct ReadOnlyTraceStore {
        inner: InMemoryPipelineStore,
    }

    #[async_trait::async_trait]
    impl PipelineStore for ReadOnlyTraceStore {
        async fn create_thread(
            &self,
            user_id: &str,
            expert_id: &str,
            name: Option<&str>,
        ) -> StoreResult<ThreadRecord> {
            self.inner.create_thread(user_id, expert_id, name).await
        }

        async fn get_thread(&self, thread_id: &str) -> StoreResult<ThreadRecord> {
            self.inner.get_thread(thread_id).await
        }

        async fn create_message(
            &self,
            thread_id: &str,
            user_id: &str,
            query: &str,
        ) -> StoreResult<MessageRecord> {
            self.inner.create_message(thread_id, user_id, query).await
        }

        async fn archive_message(&self, message_id: &str) -> StoreResult<()> {
            self.inner.archive_message(message_id).await
        }

        async fn append_step_output(
            &self,
            _message_id: &str,
            _user_id: &str,
            _output: &StepOutput,
        ) -> StoreResult<StepOutputRecord> {
            Err(StoreError::Backend("disk full".to_string()))
        }

        async fn recent_messages(
            &self,
            thread_id: &str,
            limit: usize,
        ) -> StoreResult<Vec<MessageRecord>> {
            self.inner.recent_messages(thread_id, limit).await
        }

        async fn step_outputs(&self, message_id: &str) -> StoreResult<Vec<StepOutputRecord>> {
            self.inner.step_outputs(message_id).await
        }

        async fn statistics(&self, step_output_id: &str) -> StoreResult<Vec<StatisticsRecord>> {
            self.inner.statistics(step_output_id).await
        }
    }

    #[tokio::test]
    async fn test_result_survives_persistence_failure() {
        let model = Arc::new(ScriptedModel::new(vec![LlmResponse::text(GREETING)]));
        let service = QueryService::new(
            Arc::new(ReadOnlyTraceStore::default()),
            model,
            Arc::new(StaticConnector::new()),
            PipelineConfig::default(),
        );

        let response = service.ask(request("Hello")).await.unwrap();

        assert!(response.result.is_complete);
        assert_eq!(response.result.steps.len(), 2);
        assert_eq!(
            response.result.reply.as_deref(),
            Some("Hello! Ask me anything about your sales data.")
        );
    }
}
