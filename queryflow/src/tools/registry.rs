//! Per-conversation tool set.

use super::connector::{ConnectionInfo, DatabaseConnector, QueryRows};
use super::naming::{query_executor_name, schema_getter_name, sibling_executor_name};
use super::sql::{is_read_only_query, remove_sql_comments};
use crate::errors::ToolError;
use crate::llm::{ToolCall, ToolHandler, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a bound tool does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Describes the schema of its connection.
    SchemaGetter,
    /// Runs SQL against its connection.
    QueryExecutor,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaGetter => f.write_str("schema getter"),
            Self::QueryExecutor => f.write_str("query executor"),
        }
    }
}

/// A named capability bound to one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundTool {
    /// Tool name seen by the model.
    pub name: String,
    /// Tool kind.
    pub kind: ToolKind,
    /// The connection the tool serves.
    pub connection: ConnectionInfo,
}

impl BoundTool {
    /// Description shown to the model.
    #[must_use]
    pub fn description(&self) -> String {
        match self.kind {
            ToolKind::SchemaGetter => format!(
                "useful for when you need to understand the schema of {} database",
                self.connection.connection_name
            ),
            ToolKind::QueryExecutor => format!(
                "useful for when you need to execute SQL for {} database",
                self.connection.connection_name
            ),
        }
    }

    /// Tool definition for a model request.
    #[must_use]
    pub fn spec(&self) -> ToolSpec {
        let input_schema = match self.kind {
            ToolKind::SchemaGetter => serde_json::json!({
                "type": "object",
                "properties": {},
            }),
            ToolKind::QueryExecutor => serde_json::json!({
                "type": "object",
                "properties": { "sql": { "type": "string", "description": "A valid SQL query." } },
                "required": ["sql"],
            }),
        };
        ToolSpec {
            name: self.name.clone(),
            description: self.description(),
            input_schema,
        }
    }
}

/// How a schema getter answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// Return the schema description text.
    Describe,
    /// Return the connection itself without describing anything.
    NoLlm,
}

/// Answer of a schema getter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOutput {
    /// Schema description.
    Text(String),
    /// The bound connection.
    Connection(ConnectionInfo),
}

/// Answer of a query executor.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The query succeeded.
    Rows(QueryRows),
    /// The query failed; the text is handed back to the model.
    Error(String),
}

impl QueryOutcome {
    /// Returns true for an error outcome.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// The tools available to one query invocation: a schema getter and a
/// query executor per connection.
#[derive(Clone)]
pub struct ToolSet {
    tools: Vec<BoundTool>,
    connector: Arc<dyn DatabaseConnector>,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet").field("tools", &self.names()).finish()
    }
}

impl ToolSet {
    /// Binds two tools per connection.
    #[must_use]
    pub fn from_connections(
        connections: impl IntoIterator<Item = ConnectionInfo>,
        connector: Arc<dyn DatabaseConnector>,
    ) -> Self {
        let mut tools = Vec::new();
        for connection in connections {
            tools.push(BoundTool {
                name: schema_getter_name(&connection.connection_name),
                kind: ToolKind::SchemaGetter,
                connection: connection.clone(),
            });
            tools.push(BoundTool {
                name: query_executor_name(&connection.connection_name),
                kind: ToolKind::QueryExecutor,
                connection,
            });
        }
        Self { tools, connector }
    }

    /// Returns every bound tool.
    #[must_use]
    pub fn tools(&self) -> &[BoundTool] {
        &self.tools
    }

    /// Returns every tool name.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Returns true if no tools are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Looks a tool up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoundTool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Returns the schema getters.
    pub fn schema_tools(&self) -> impl Iterator<Item = &BoundTool> {
        self.tools.iter().filter(|t| t.kind == ToolKind::SchemaGetter)
    }

    /// Returns the executor bound to the same connection as a schema getter.
    #[must_use]
    pub fn executor_for_schema(&self, schema_tool_name: &str) -> Option<&BoundTool> {
        let name = sibling_executor_name(schema_tool_name)?;
        self.get(&name).filter(|t| t.kind == ToolKind::QueryExecutor)
    }

    /// Returns the connection with the given id.
    #[must_use]
    pub fn connection(&self, connection_id: &str) -> Option<&ConnectionInfo> {
        self.tools
            .iter()
            .map(|t| &t.connection)
            .find(|c| c.connection_id == connection_id)
    }

    fn lookup(&self, name: &str, kind: ToolKind) -> Result<&BoundTool, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::not_found(name))?;
        if tool.kind != kind {
            return Err(ToolError::wrong_kind(name, kind.to_string()));
        }
        Ok(tool)
    }

    /// Runs a schema getter.
    pub async fn schema(&self, name: &str, mode: SchemaMode) -> Result<SchemaOutput, ToolError> {
        let tool = self.lookup(name, ToolKind::SchemaGetter)?;
        let connection = &tool.connection;

        if mode == SchemaMode::NoLlm {
            return Ok(SchemaOutput::Connection(connection.clone()));
        }

        let described = self
            .connector
            .describe_schema(connection)
            .await
            .map_err(|reason| ToolError::execution_failed(name, reason))?;

        Ok(SchemaOutput::Text(format!(
            "sql_dialect: {}\n\nAbout Database: {}\n\nInstructions: {}",
            connection.sql_dialect, connection.instructions, described
        )))
    }

    /// Runs a schema getter in describe mode and returns the text.
    pub async fn schema_text(&self, name: &str) -> Result<String, ToolError> {
        match self.schema(name, SchemaMode::Describe).await? {
            SchemaOutput::Text(text) => Ok(text),
            SchemaOutput::Connection(c) => Ok(c.instructions),
        }
    }

    /// Resolves a schema getter to its connection id.
    pub async fn connection_id_for(&self, schema_tool_name: &str) -> Option<String> {
        if schema_tool_name.is_empty() {
            return None;
        }
        match self.schema(schema_tool_name, SchemaMode::NoLlm).await {
            Ok(SchemaOutput::Connection(c)) if !c.connection_id.is_empty() => Some(c.connection_id),
            _ => None,
        }
    }

    /// Runs a query executor. Write statements are refused without reaching
    /// the connector.
    pub async fn execute(&self, name: &str, sql: &str) -> Result<QueryOutcome, ToolError> {
        let tool = self.lookup(name, ToolKind::QueryExecutor)?;

        if let Some(refusal) = guard(sql) {
            warn!(tool = %name, "Refused non read-only SQL");
            return Ok(QueryOutcome::Error(refusal));
        }

        debug!(tool = %name, "Executing SQL");
        Ok(match self.connector.execute(&tool.connection, sql).await {
            Ok(rows) => QueryOutcome::Rows(rows),
            Err(message) => QueryOutcome::Error(message),
        })
    }

    /// Executes SQL on a connection by id and returns one page.
    pub async fn execute_paged(
        &self,
        connection_id: &str,
        sql: &str,
        page: usize,
        page_size: usize,
    ) -> Result<QueryOutcome, ToolError> {
        let connection = self
            .connection(connection_id)
            .ok_or_else(|| ToolError::not_found(connection_id))?;

        if let Some(refusal) = guard(sql) {
            return Ok(QueryOutcome::Error(refusal));
        }

        Ok(
            match self
                .connector
                .execute_paged(connection, sql, page, page_size)
                .await
            {
                Ok(rows) => QueryOutcome::Rows(rows),
                Err(message) => QueryOutcome::Error(message),
            },
        )
    }

    /// Adapts the schema getters for a tool-calling model loop.
    #[must_use]
    pub fn schema_handler(&self) -> SchemaToolHandler<'_> {
        SchemaToolHandler { tools: self }
    }
}

fn guard(sql: &str) -> Option<String> {
    if remove_sql_comments(sql).trim().is_empty() {
        return Some("Error: SQL was not provided".to_string());
    }
    if !is_read_only_query(sql) {
        return Some("Error: only read-only queries are allowed".to_string());
    }
    None
}

/// Serves schema getter calls issued by a model. Any other tool is refused.
#[derive(Debug, Clone, Copy)]
pub struct SchemaToolHandler<'a> {
    tools: &'a ToolSet,
}

impl SchemaToolHandler<'_> {
    /// Tool definitions exposed to the model.
    #[must_use]
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.schema_tools().map(BoundTool::spec).collect()
    }
}

#[async_trait]
impl ToolHandler for SchemaToolHandler<'_> {
    async fn call(&self, call: &ToolCall) -> String {
        match self.tools.schema(&call.name, SchemaMode::Describe).await {
            Ok(SchemaOutput::Text(text)) => text,
            Ok(SchemaOutput::Connection(_)) => String::new(),
            Err(err) => format!("Error: {err}"),
        }
    }
}
