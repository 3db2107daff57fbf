//! Configuration types.
//!
//! Every struct deserializes with per-field defaults, so a partial JSON
//! document only overrides what it names.

use crate::errors::QueryflowError;
use crate::steps::Prompts;
use serde::{Deserialize, Serialize};

/// Budgets and limits of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Retry budget attached to retryable step failures.
    #[serde(default = "default_step_retry_budget")]
    pub step_retry_budget: usize,
    /// SQL generation attempts before giving up.
    #[serde(default = "default_sql_generation_attempts")]
    pub sql_generation_attempts: usize,
    /// Result rows kept in step data.
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
    /// Model calls allowed in the requirement gathering loop.
    #[serde(default = "default_agent_max_iterations")]
    pub agent_max_iterations: usize,
    /// Chat history messages loaded for context.
    #[serde(default = "default_history_depth")]
    pub history_depth: i64,
    /// Page size used when the summarizer re-executes SQL.
    #[serde(default = "default_summary_page_size")]
    pub summary_page_size: usize,
    /// Ask the model to classify questions instead of passing them through.
    /// The classification stays advisory either way.
    #[serde(default)]
    pub model_classification: bool,
    /// Prompt templates.
    #[serde(default)]
    pub prompts: Prompts,
}

fn default_step_retry_budget() -> usize {
    crate::errors::DEFAULT_RETRY_COUNT
}

fn default_sql_generation_attempts() -> usize {
    3
}

fn default_sample_rows() -> usize {
    10
}

fn default_agent_max_iterations() -> usize {
    5
}

fn default_history_depth() -> i64 {
    100
}

fn default_summary_page_size() -> usize {
    10
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            step_retry_budget: default_step_retry_budget(),
            sql_generation_attempts: default_sql_generation_attempts(),
            sample_rows: default_sample_rows(),
            agent_max_iterations: default_agent_max_iterations(),
            history_depth: default_history_depth(),
            summary_page_size: default_summary_page_size(),
            model_classification: false,
            prompts: Prompts::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, QueryflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects budgets that would make a step unable to run.
    pub fn validate(&self) -> Result<(), QueryflowError> {
        if self.sql_generation_attempts == 0 {
            return Err(QueryflowError::Config(
                "sql_generation_attempts must be at least 1".to_string(),
            ));
        }
        if self.agent_max_iterations == 0 {
            return Err(QueryflowError::Config(
                "agent_max_iterations must be at least 1".to_string(),
            ));
        }
        if self.summary_page_size == 0 {
            return Err(QueryflowError::Config(
                "summary_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the step retry budget.
    #[must_use]
    pub fn with_step_retry_budget(mut self, budget: usize) -> Self {
        self.step_retry_budget = budget;
        self
    }

    /// Sets the SQL generation attempts, at least one.
    #[must_use]
    pub fn with_sql_generation_attempts(mut self, attempts: usize) -> Self {
        self.sql_generation_attempts = attempts.max(1);
        self
    }

    /// Sets the number of sample rows kept.
    #[must_use]
    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = rows;
        self
    }

    /// Sets the agent iteration limit.
    #[must_use]
    pub fn with_agent_max_iterations(mut self, iterations: usize) -> Self {
        self.agent_max_iterations = iterations;
        self
    }

    /// Sets the chat history depth.
    #[must_use]
    pub fn with_history_depth(mut self, depth: i64) -> Self {
        self.history_depth = depth;
        self
    }

    /// Enables model-backed classification.
    #[must_use]
    pub fn with_model_classification(mut self, enabled: bool) -> Self {
        self.model_classification = enabled;
        self
    }

    /// Sets the prompt templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }
}

/// Generation settings of a model endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum completion tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Whether to stream responses.
    #[serde(default)]
    pub streaming: bool,
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            streaming: false,
        }
    }
}

/// Settings of the Anthropic Messages API client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum completion tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl AnthropicConfig {
    /// Reads `ANTHROPIC_API_KEY`, `ANTHROPIC_BASE_URL` and `QUERYFLOW_MODEL`,
    /// falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.api_key = key;
        }
        if let Ok(url) = std::env::var("ANTHROPIC_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("QUERYFLOW_MODEL") {
            config.model = model;
        }
        config
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Applies generation settings.
    #[must_use]
    pub fn with_model_config(mut self, model: &ModelConfig) -> Self {
        self.model = model.model.clone();
        self.max_tokens = model.max_tokens;
        self.temperature = model.temperature;
        self
    }
}
