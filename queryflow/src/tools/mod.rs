//! Database tools bound per conversation.
//!
//! This module provides:
//! - The connector seam (`DatabaseConnector`) and result shapes
//! - Tool naming (`{connection}SchemaGetter` / `{connection}QueryExecutor`)
//! - The `ToolSet` handed to pipeline steps
//! - The read-only SQL guard

mod connector;
mod naming;
mod registry;
mod sql;

pub use connector::{Column, ConnectionInfo, DatabaseConnector, QueryRows};
#[cfg(test)]
pub use connector::MockDatabaseConnector;
pub use naming::{
    camel_case, query_executor_name, schema_getter_name, sibling_executor_name,
    QUERY_EXECUTOR_SUFFIX, SCHEMA_GETTER_SUFFIX,
};
pub use registry::{
    BoundTool, QueryOutcome, SchemaMode, SchemaOutput, SchemaToolHandler, ToolKind, ToolSet,
};
pub use sql::{is_read_only_query, remove_sql_comments, WRITE_COMMANDS};
