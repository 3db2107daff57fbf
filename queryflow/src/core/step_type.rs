//! Step type tag.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which pipeline stage produced a `StepOutput`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Decides whether the question is data-analytics related.
    QuestionClassification,
    /// Gathers and clarifies the analytical requirement.
    RequirementsExtraction,
    /// Generates and verifies SQL.
    NaturalLanguageToSql,
    /// Summarizes query results.
    DataSummarization,
    /// Explains a SQL query.
    ExplainSqlQuery,
}

impl StepType {
    /// Returns the persisted string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuestionClassification => "question_classification",
            Self::RequirementsExtraction => "requirements_extraction",
            Self::NaturalLanguageToSql => "natural_language_to_sql",
            Self::DataSummarization => "data_summarization",
            Self::ExplainSqlQuery => "explain_sql_query",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
