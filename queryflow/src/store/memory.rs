//! In-memory store.

use super::{MessageRecord, PipelineStore, StatisticsRecord, StepOutputRecord, ThreadRecord};
use crate::core::StepOutput;
use crate::errors::{StoreError, StoreResult};
use crate::utils::generate_id;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;

/// A [`PipelineStore`] kept in process memory.
///
/// Messages and step outputs keep insertion order.
#[derive(Debug, Default)]
pub struct InMemoryPipelineStore {
    threads: DashMap<String, ThreadRecord>,
    messages: RwLock<Vec<MessageRecord>>,
    outputs: RwLock<Vec<StepOutputRecord>>,
    statistics: RwLock<Vec<StatisticsRecord>>,
}

impl InMemoryPipelineStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored step outputs.
    #[must_use]
    pub fn output_count(&self) -> usize {
        self.outputs.read().len()
    }

    /// Returns the number of stored statistics records.
    #[must_use]
    pub fn statistics_count(&self) -> usize {
        self.statistics.read().len()
    }
}

#[async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn create_thread(
        &self,
        user_id: &str,
        expert_id: &str,
        name: Option<&str>,
    ) -> StoreResult<ThreadRecord> {
        let record = ThreadRecord {
            id: generate_id(),
            user_id: user_id.to_string(),
            expert_id: expert_id.to_string(),
            name: name.map(str::to_string),
            is_archived: false,
            time_created: Utc::now(),
        };
        self.threads.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_thread(&self, thread_id: &str) -> StoreResult<ThreadRecord> {
        self.threads
            .get(thread_id)
            .filter(|t| !t.is_archived)
            .map(|t| t.clone())
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))
    }

    async fn create_message(
        &self,
        thread_id: &str,
        user_id: &str,
        query: &str,
    ) -> StoreResult<MessageRecord> {
        if !self.threads.contains_key(thread_id) {
            return Err(StoreError::ThreadNotFound(thread_id.to_string()));
        }
        let record = MessageRecord {
            id: generate_id(),
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
            query: query.to_string(),
            is_archived: false,
            time_created: Utc::now(),
        };
        self.messages.write().push(record.clone());
        Ok(record)
    }

    async fn archive_message(&self, message_id: &str) -> StoreResult<()> {
        let mut messages = self.messages.write();
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| StoreError::MessageNotFound(message_id.to_string()))?;
        message.is_archived = true;
        Ok(())
    }

    async fn append_step_output(
        &self,
        message_id: &str,
        user_id: &str,
        output: &StepOutput,
    ) -> StoreResult<StepOutputRecord> {
        let thread_id = self
            .messages
            .read()
            .iter()
            .find(|m| m.id == message_id)
            .map(|m| m.thread_id.clone())
            .ok_or_else(|| StoreError::MessageNotFound(message_id.to_string()))?;

        let record = StepOutputRecord {
            id: generate_id(),
            thread_id,
            message_id: message_id.to_string(),
            user_id: user_id.to_string(),
            output: output.clone(),
            time_created: Utc::now(),
        };

        if let Some(stats) = &output.statistics {
            self.statistics.write().push(StatisticsRecord {
                id: generate_id(),
                step_output_id: record.id.clone(),
                statistics: stats.clone(),
            });
        }
        self.outputs.write().push(record.clone());
        Ok(record)
    }

    async fn recent_messages(
        &self,
        thread_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<MessageRecord>> {
        let messages = self.messages.read();
        let mut recent: Vec<MessageRecord> = messages
            .iter()
            .rev()
            .filter(|m| m.thread_id == thread_id && !m.is_archived)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn step_outputs(&self, message_id: &str) -> StoreResult<Vec<StepOutputRecord>> {
        Ok(self
            .outputs
            .read()
            .iter()
            .filter(|o| o.message_id == message_id)
            .cloned()
            .collect())
    }

    async fn statistics(&self, step_output_id: &str) -> StoreResult<Vec<StatisticsRecord>> {
        Ok(self
            .statistics
            .read()
            .iter()
            .filter(|s| s.step_output_id == step_output_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StepData, StepStatistics, StepType};
    use serde_json::json;

    fn stats() -> StepStatistics {
        StepStatistics {
            model_name: "sonnet".to_string(),
            client_info: json!({"provider": "test"}),
            completion_tokens: 1,
            prompt_tokens: 2,
            call_start_time: 0.0,
            call_end_time: 1.0,
            is_streaming_output: false,
            step_type: StepType::DataSummarization,
        }
    }

    #[tokio::test]
    async fn test_thread_and_message_lifecycle() {
        let store = InMemoryPipelineStore::new();
        let thread = store.create_thread("u1", "expert", Some("Sales")).await.unwrap();
        assert_eq!(store.get_thread(&thread.id).await.unwrap().name.as_deref(), Some("Sales"));

        let message = store.create_message(&thread.id, "u1", "How many orders?").await.unwrap();
        assert_eq!(message.thread_id, thread.id);

        let err = store.create_message("missing", "u1", "q").await.unwrap_err();
        assert!(matches!(err, StoreError::ThreadNotFound(_)));
    }

    #[tokio::test]
    async fn test_recent_messages_oldest_first_and_limited() {
        let store = InMemoryPipelineStore::new();
        let thread = store.create_thread("u1", "expert", None).await.unwrap();
        for q in ["first", "second", "third"] {
            store.create_message(&thread.id, "u1", q).await.unwrap();
        }

        let recent = store.recent_messages(&thread.id, 2).await.unwrap();
        let queries: Vec<&str> = recent.iter().map(|m| m.query.as_str()).collect();
        assert_eq!(queries, vec!["second", "third"]);
    }

    #[tokio::test]
    async fn test_archived_messages_hidden() {
        let store = InMemoryPipelineStore::new();
        let thread = store.create_thread("u1", "expert", None).await.unwrap();
        let first = store.create_message(&thread.id, "u1", "first").await.unwrap();
        store.create_message(&thread.id, "u1", "second").await.unwrap();
        store.archive_message(&first.id).await.unwrap();

        let recent = store.recent_messages(&thread.id, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].query, "second");
    }

    #[tokio::test]
    async fn test_append_step_output_stores_statistics() {
        let store = InMemoryPipelineStore::new();
        let thread = store.create_thread("u1", "expert", None).await.unwrap();
        let message = store.create_message(&thread.id, "u1", "q").await.unwrap();

        let with_stats = StepOutput::finish(StepType::DataSummarization, StepData::new())
            .with_statistics(stats());
        let without = StepOutput::proceed(StepType::QuestionClassification, StepData::new());

        store.append_step_output(&message.id, "u1", &without).await.unwrap();
        let record = store.append_step_output(&message.id, "u1", &with_stats).await.unwrap();

        assert_eq!(record.thread_id, thread.id);
        assert_eq!(store.output_count(), 2);
        assert_eq!(store.statistics_count(), 1);
        assert_eq!(store.statistics(&record.id).await.unwrap()[0].statistics, stats());

        let outputs = store.step_outputs(&message.id).await.unwrap();
        assert_eq!(outputs[0].output.step_type, StepType::QuestionClassification);
        assert_eq!(outputs[1].output.step_type, StepType::DataSummarization);
    }

    #[tokio::test]
    async fn test_append_to_unknown_message() {
        let store = InMemoryPipelineStore::new();
        let output = StepOutput::proceed(StepType::QuestionClassification, StepData::new());
        let err = store.append_step_output("nope", "u1", &output).await.unwrap_err();
        assert!(matches!(err, StoreError::MessageNotFound(_)));
    }
}
