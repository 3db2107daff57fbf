//! Records emitted by each step's model call.

use super::{FieldSpec, StructuredResponse};
use serde::{Deserialize, Serialize};

/// Output of the question classifier prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    /// Message for the user.
    pub reply: String,
    /// Whether the question needs data analysis.
    pub is_data_analytics_related: bool,
}

impl StructuredResponse for ClassificationResponse {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::string("reply"),
        FieldSpec::boolean("is_data_analytics_related"),
    ];
}

/// Output of the requirement gathering agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementResponse {
    /// Message for the user.
    pub reply: String,
    /// Schema tool naming the chosen connection.
    pub schema_tool_name: Option<String>,
    /// Requirement and query plan handed to SQL generation.
    pub requirement: Option<String>,
    /// Whether the requirement is specific enough to query.
    pub is_requirement_clear: bool,
    /// Whether the chat history already answers the question.
    pub is_already_answered_without_further_queries: bool,
}

impl StructuredResponse for RequirementResponse {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::string("reply"),
        FieldSpec::optional_string("schema_tool_name"),
        FieldSpec::optional_string("requirement"),
        FieldSpec::boolean("is_requirement_clear"),
        FieldSpec::boolean("is_already_answered_without_further_queries"),
    ];
}

/// Output of the SQL generation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlGenerationResponse {
    /// Message for the user.
    pub reply: String,
    /// The generated SQL, absent when the model declined to write one.
    pub sql: Option<String>,
}

impl StructuredResponse for SqlGenerationResponse {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::string("reply"),
        FieldSpec::optional_string("sql"),
    ];
}

/// Output of the data summarization prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Message for the user.
    pub reply: String,
    /// Markdown summary of the result rows.
    pub data_summary: String,
}

impl StructuredResponse for SummaryResponse {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::string("reply"),
        FieldSpec::string("data_summary"),
    ];
}

/// Output of the SQL explanation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationResponse {
    /// Message for the user.
    pub reply: String,
    /// Plain-language explanation of the query.
    pub explanation: String,
}

impl StructuredResponse for ExplanationResponse {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::string("reply"),
        FieldSpec::string("explanation"),
    ];
}
