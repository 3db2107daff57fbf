//! Persistence of threads, messages and step outputs.
//!
//! The pipeline itself never touches the store; the query service appends
//! one record per step output after a run, and the store-backed context
//! provider reads them back as chat history.

mod memory;

pub use memory::InMemoryPipelineStore;

use crate::core::{StepOutput, StepStatistics};
use crate::errors::StoreResult;
use crate::utils::Timestamp;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    /// Thread id.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Expert the thread belongs to.
    pub expert_id: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Archived threads are hidden.
    pub is_archived: bool,
    /// Creation time.
    pub time_created: Timestamp,
}

/// One user question within a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message id.
    pub id: String,
    /// Owning thread.
    pub thread_id: String,
    /// Author.
    pub user_id: String,
    /// The question text.
    pub query: String,
    /// Archived messages are excluded from chat history.
    pub is_archived: bool,
    /// Creation time.
    pub time_created: Timestamp,
}

/// A persisted step output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutputRecord {
    /// Record id.
    pub id: String,
    /// Owning thread.
    pub thread_id: String,
    /// Owning message.
    pub message_id: String,
    /// Author of the message.
    pub user_id: String,
    /// The step output.
    pub output: StepOutput,
    /// Creation time.
    pub time_created: Timestamp,
}

/// Persisted statistics of one step output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    /// Record id.
    pub id: String,
    /// The step output the statistics belong to.
    pub step_output_id: String,
    /// The statistics.
    pub statistics: StepStatistics,
}

/// Storage collaborator of the query service.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Creates a thread.
    async fn create_thread(
        &self,
        user_id: &str,
        expert_id: &str,
        name: Option<&str>,
    ) -> StoreResult<ThreadRecord>;

    /// Loads a non-archived thread.
    async fn get_thread(&self, thread_id: &str) -> StoreResult<ThreadRecord>;

    /// Creates a message in an existing thread.
    async fn create_message(
        &self,
        thread_id: &str,
        user_id: &str,
        query: &str,
    ) -> StoreResult<MessageRecord>;

    /// Hides a message from chat history.
    async fn archive_message(&self, message_id: &str) -> StoreResult<()>;

    /// Appends a step output and, when present, its statistics.
    async fn append_step_output(
        &self,
        message_id: &str,
        user_id: &str,
        output: &StepOutput,
    ) -> StoreResult<StepOutputRecord>;

    /// Returns the `limit` most recent non-archived messages of a thread,
    /// oldest first.
    async fn recent_messages(&self, thread_id: &str, limit: usize)
        -> StoreResult<Vec<MessageRecord>>;

    /// Returns the step outputs of a message in insertion order.
    async fn step_outputs(&self, message_id: &str) -> StoreResult<Vec<StepOutputRecord>>;

    /// Returns the statistics recorded for a step output.
    async fn statistics(&self, step_output_id: &str) -> StoreResult<Vec<StatisticsRecord>>;
}
