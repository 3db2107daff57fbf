//! # Queryflow
//!
//! Answers natural-language questions about relational data by running a
//! fixed sequence of language-model steps over a shared state.
//!
//! - **Classification**: routes the question into the pipeline
//! - **Requirement gathering**: a tool-calling agent inspects schemas and
//!   decides whether the question is answerable and on which connection
//! - **SQL generation**: writes read-only SQL and repairs it from
//!   execution errors
//! - **Summarization**: turns the result rows into a markdown answer
//!
//! Steps report through [`core::StepOutput`]; the
//! [`pipeline::QueryPipeline`] merges their data, retries recoverable
//! failures within a bounded budget, and stops on terminal outputs or
//! fatal errors.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use queryflow::prelude::*;
//!
//! let service = QueryService::new(store, model, connector, PipelineConfig::default());
//! let response = service
//!     .ask(QueryRequest::new("Orders per month in 2024", "user-1", "expert-1")
//!         .with_connection(connection))
//!     .await?;
//! println!("{}", response.result.reply.unwrap_or_default());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod llm;
pub mod observability;
pub mod parser;
pub mod pipeline;
pub mod service;
pub mod steps;
pub mod store;
pub mod testing;
pub mod tools;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ModelConfig, PipelineConfig};
    pub use crate::context::{ChatTurn, ContextProvider, StoreBackedContext};
    pub use crate::core::{StepData, StepOutcome, StepOutput, StepStatistics, StepType};
    pub use crate::errors::{QueryflowError, StepError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::llm::{LanguageModel, LlmRequest, LlmResponse, ModelInfo};
    pub use crate::pipeline::{PipelineResult, QueryPipeline, RunRequest};
    pub use crate::service::{QueryRequest, QueryResponse, QueryService};
    pub use crate::steps::PipelineStep;
    pub use crate::store::{InMemoryPipelineStore, PipelineStore};
    pub use crate::tools::{ConnectionInfo, DatabaseConnector, QueryRows, ToolSet};
}
