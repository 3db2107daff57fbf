//! Shared key/value state threaded through a pipeline run.

use crate::core::StepData;
use serde::{Deserialize, Serialize};

/// Accumulated data of the successful steps of one run.
///
/// Only the orchestrator mutates the state; steps receive it by shared
/// reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineState {
    data: StepData,
}

impl PipelineState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a non-empty string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Sets a single value.
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Shallow merge; keys in `data` overwrite existing keys.
    pub fn merge(&mut self, data: &StepData) {
        for (key, value) in data {
            self.data.insert(key.clone(), value.clone());
        }
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the state is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrows the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &StepData {
        &self.data
    }

    /// Consumes the state and returns the underlying map.
    #[must_use]
    pub fn into_map(self) -> StepData {
        self.data
    }
}

impl From<StepData> for PipelineState {
    fn from(data: StepData) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_last_write_wins() {
        let mut state = PipelineState::new();
        state.insert("reply", json!("first"));
        state.insert("sql", json!("SELECT 1"));

        let mut data = StepData::new();
        data.insert("reply".to_string(), json!("second"));
        data.insert("data_summary".to_string(), json!("**1** row"));
        state.merge(&data);

        assert_eq!(state.len(), 3);
        assert_eq!(state.get_str("reply"), Some("second"));
        assert_eq!(state.get_str("sql"), Some("SELECT 1"));
        assert_eq!(state.get_str("data_summary"), Some("**1** row"));
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut state = PipelineState::new();
        state.insert("sql_data", json!({"columns": [1], "rows": [[1]]}));

        let mut data = StepData::new();
        data.insert("sql_data".to_string(), json!({"rows": []}));
        state.merge(&data);

        assert_eq!(state.get("sql_data"), Some(&json!({"rows": []})));
    }

    #[test]
    fn test_get_str_ignores_blank_and_non_strings() {
        let mut state = PipelineState::new();
        state.insert("requirement", json!("  "));
        state.insert("connection_id", json!(42));
        assert_eq!(state.get_str("requirement"), None);
        assert_eq!(state.get_str("connection_id"), None);
        assert!(state.contains("requirement"));
    }
}
