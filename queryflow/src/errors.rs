//! Error types for the queryflow pipeline.
//!
//! The taxonomy separates failures a pipeline step can recover from by
//! re-running (`StepError::Retryable`) from failures that halt the pipeline
//! (`StepError::Fatal`). Collaborator errors (model, tools, store, parser)
//! have their own enums and are folded into a `StepError` at the step
//! boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default number of extra attempts granted to a retryable step failure.
pub const DEFAULT_RETRY_COUNT: usize = 3;

/// The top-level error type for queryflow operations outside of a pipeline run.
#[derive(Debug, Error)]
pub enum QueryflowError {
    /// The caller submitted an empty question.
    #[error("Query is required")]
    EmptyQuery,

    /// A persistence error.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A language model error.
    #[error("{0}")]
    Llm(#[from] LlmError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The error carried by a failed `StepOutput`.
///
/// Serialized with a `kind` tag so the persisted trace keeps the
/// retryable/fatal distinction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepError {
    /// A failure that the orchestrator may recover from by re-running the step.
    #[error("{message}")]
    Retryable {
        /// Human-readable description.
        message: String,
        /// How many extra attempts the orchestrator may make.
        retry_count: usize,
    },

    /// A failure that halts the pipeline immediately.
    #[error("{message}")]
    Fatal {
        /// Human-readable description.
        message: String,
    },
}

impl StepError {
    /// Creates a retryable error with the default retry budget.
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable {
            message: message.into(),
            retry_count: DEFAULT_RETRY_COUNT,
        }
    }

    /// Creates a retryable error with an explicit retry budget.
    #[must_use]
    pub fn retryable_with_budget(message: impl Into<String>, retry_count: usize) -> Self {
        Self::Retryable {
            message: message.into(),
            retry_count,
        }
    }

    /// Creates a fatal error.
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Returns true if the orchestrator may re-run the step.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }

    /// Returns the retry budget, or zero for fatal errors.
    #[must_use]
    pub fn retry_count(&self) -> usize {
        match self {
            Self::Retryable { retry_count, .. } => *retry_count,
            Self::Fatal { .. } => 0,
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Retryable { message, .. } | Self::Fatal { message } => message,
        }
    }
}

impl From<ParseError> for StepError {
    fn from(err: ParseError) -> Self {
        Self::retryable(format!("Error in parsing output: {err}"))
    }
}

impl From<LlmError> for StepError {
    fn from(err: LlmError) -> Self {
        Self::fatal(err.to_string())
    }
}

impl From<ToolError> for StepError {
    fn from(err: ToolError) -> Self {
        Self::fatal(err.to_string())
    }
}

/// A failure to turn model output into a typed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Description of what went wrong.
    pub message: String,
    /// Fields that were missing or had the wrong type.
    pub fields: Vec<String>,
}

impl ParseError {
    /// Creates a parse error not tied to a particular field.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Creates a parse error listing the offending fields.
    #[must_use]
    pub fn invalid_fields(fields: Vec<String>) -> Self {
        Self {
            message: "invalid or missing fields".to_string(),
            fields,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.message, self.fields.join(", "))
        }
    }
}

impl std::error::Error for ParseError {}

/// Language model errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request could not be delivered or the response not read.
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// The provider answered with an error status.
    #[error("LLM provider error ({status}): {message}")]
    Provider {
        /// HTTP-like status code.
        status: u16,
        /// Provider message.
        message: String,
    },

    /// The provider answer could not be decoded.
    #[error("LLM response decode error: {0}")]
    Decode(String),

    /// The client is not configured (e.g. missing API key).
    #[error("LLM client not configured: {0}")]
    NotConfigured(String),
}

/// Tool-related errors.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// No tool with this name is bound for the conversation.
    #[error("Tool not found: {name}")]
    NotFound {
        /// The requested tool name.
        name: String,
    },

    /// The tool exists but is of the other kind.
    #[error("Tool {name} is not a {expected}")]
    WrongKind {
        /// The requested tool name.
        name: String,
        /// The kind the caller expected.
        expected: String,
    },

    /// The connector failed while serving the tool.
    #[error("Tool execution failed: {name} - {reason}")]
    ExecutionFailed {
        /// The tool name.
        name: String,
        /// The failure reason.
        reason: String,
    },
}

impl ToolError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates a wrong-kind error.
    #[must_use]
    pub fn wrong_kind(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::WrongKind {
            name: name.into(),
            expected: expected.into(),
        }
    }

    /// Creates an execution-failed error.
    #[must_use]
    pub fn execution_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced thread does not exist.
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    /// The referenced message does not exist.
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// A backend-specific failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for language model calls.
pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_defaults() {
        let err = StepError::retryable("bad yaml");
        assert!(err.is_retryable());
        assert_eq!(err.retry_count(), DEFAULT_RETRY_COUNT);
        assert_eq!(err.to_string(), "bad yaml");
    }

    #[test]
    fn test_fatal_has_no_budget() {
        let err = StepError::fatal("No requirement found");
        assert!(!err.is_retryable());
        assert_eq!(err.retry_count(), 0);
        assert_eq!(err.message(), "No requirement found");
    }

    #[test]
    fn test_parse_error_becomes_retryable() {
        let err: StepError = ParseError::invalid_fields(vec!["reply".to_string()]).into();
        assert!(err.is_retryable());
        assert!(err.message().contains("reply"));
    }

    #[test]
    fn test_tool_error_becomes_fatal() {
        let err: StepError = ToolError::not_found("salesSchemaGetter").into();
        assert!(!err.is_retryable());
        assert_eq!(err.message(), "Tool not found: salesSchemaGetter");
    }

    #[test]
    fn test_step_error_serialization() {
        let err = StepError::retryable_with_budget("oops", 1);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "retryable");
        assert_eq!(json["retry_count"], 1);

        let back: StepError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::invalid_fields(vec!["reply".into(), "sql".into()]);
        assert_eq!(err.to_string(), "invalid or missing fields: reply, sql");
        assert_eq!(ParseError::new("no fenced block").to_string(), "no fenced block");
    }
}
