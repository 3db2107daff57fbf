//! Database connector seam and result shapes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A database connection the user may query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Stable connection id.
    pub connection_id: String,
    /// Human-readable name; tool names derive from it.
    pub connection_name: String,
    /// Physical database name.
    pub db_name: String,
    /// SQL dialect (e.g. `postgresql`).
    pub sql_dialect: String,
    /// Free-form notes about the database.
    #[serde(default)]
    pub instructions: String,
}

impl ConnectionInfo {
    /// Creates connection info with empty instructions.
    #[must_use]
    pub fn new(
        connection_id: impl Into<String>,
        connection_name: impl Into<String>,
        db_name: impl Into<String>,
        sql_dialect: impl Into<String>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            connection_name: connection_name.into(),
            db_name: db_name.into(),
            sql_dialect: sql_dialect.into(),
            instructions: String::new(),
        }
    }

    /// Sets the instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

/// A result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub column_name: String,
    /// Database type name.
    pub data_type: String,
}

impl Column {
    /// Creates a column.
    #[must_use]
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Rows returned by a query, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    /// Result columns.
    pub columns: Vec<Column>,
    /// Row values, one entry per column.
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryRows {
    /// Creates a result set.
    #[must_use]
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Keeps at most `limit` rows.
    #[must_use]
    pub fn truncated(mut self, limit: usize) -> Self {
        self.rows.truncate(limit);
        self
    }

    /// Converts to the JSON shape stored in step data.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Reads the JSON shape stored in step data.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Executes SQL and describes schemas for a connection.
///
/// Errors are plain text; they are handed to the model verbatim.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Describes the tables and columns of the connection.
    async fn describe_schema(&self, connection: &ConnectionInfo) -> Result<String, String>;

    /// Executes a query.
    async fn execute(&self, connection: &ConnectionInfo, sql: &str) -> Result<QueryRows, String>;

    /// Executes a query and returns one page of results. Pages start at 1.
    async fn execute_paged(
        &self,
        connection: &ConnectionInfo,
        sql: &str,
        page: usize,
        page_size: usize,
    ) -> Result<QueryRows, String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_json_shape() {
        let rows = QueryRows::new(
            vec![Column::new("month", "text"), Column::new("total", "numeric")],
            vec![vec![json!("2024-01"), json!(12.5)]],
        );
        let value = rows.to_value();
        assert_eq!(value["columns"][0]["column_name"], "month");
        assert_eq!(value["rows"][0][1], 12.5);
        assert_eq!(QueryRows::from_value(&value), Some(rows));
    }

    #[test]
    fn test_truncated() {
        let rows = QueryRows::new(
            vec![Column::new("n", "int")],
            (0..15).map(|i| vec![json!(i)]).collect(),
        );
        assert_eq!(rows.truncated(10).len(), 10);
    }
}
