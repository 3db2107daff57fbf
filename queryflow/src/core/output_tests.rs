//! Comprehensive tests for StepOutput.

#[cfg(test)]
mod tests {
    use crate::core::{StepData, StepOutcome, StepOutput, StepStatistics, StepType};
    use crate::errors::StepError;
    use serde_json::json;

    fn stats() -> StepStatistics {
        StepStatistics {
            model_name: "sonnet".to_string(),
            client_info: json!({"provider": "test"}),
            completion_tokens: 12,
            prompt_tokens: 340,
            call_start_time: 1_700_000_000.0,
            call_end_time: 1_700_000_002.5,
            is_streaming_output: false,
            step_type: StepType::RequirementsExtraction,
        }
    }

    #[test]
    fn test_output_with_input() {
        let output = StepOutput::proceed(StepType::QuestionClassification, StepData::new())
            .add_input("query", json!("How many orders?"));
        assert_eq!(output.input.get("query"), Some(&json!("How many orders?")));
        assert!(output.data.is_empty());
    }

    #[test]
    fn test_output_keeps_raw_data_on_failure() {
        let output = StepOutput::retryable(StepType::RequirementsExtraction, "Error in parsing output")
            .with_raw_data("reply: [unterminated");
        assert_eq!(output.raw_data, "reply: [unterminated");
        assert!(output.is_retryable());
    }

    #[test]
    fn test_output_with_statistics() {
        let output = StepOutput::finish(StepType::RequirementsExtraction, StepData::new())
            .with_statistics(stats());
        let recorded = output.statistics.as_ref().unwrap();
        assert_eq!(recorded.total_tokens(), 352);
        assert!((recorded.duration_seconds() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_output_with_optional_statistics_none() {
        let output = StepOutput::finish(StepType::DataSummarization, StepData::new())
            .with_optional_statistics(None);
        assert!(output.statistics.is_none());
    }

    #[test]
    fn test_output_metadata_not_in_data() {
        let output = StepOutput::proceed(StepType::NaturalLanguageToSql, StepData::new())
            .add_metadata("generation_attempts", json!([{"sql": "SELECT 1"}]));
        assert!(output.get("generation_attempts").is_none());
        assert!(output.metadata.contains_key("generation_attempts"));
    }

    #[test]
    fn test_custom_retry_budget() {
        let output = StepOutput::fail(
            StepType::DataSummarization,
            StepError::retryable_with_budget("flaky", 1),
        );
        assert_eq!(output.outcome(), StepOutcome::Retry(1));
    }

    #[test]
    fn test_output_serialization() {
        let mut data = StepData::new();
        data.insert("reply".to_string(), json!("Hello"));
        data.insert("is_requirement_clear".to_string(), json!(true));

        let output = StepOutput::finish(StepType::RequirementsExtraction, data)
            .add_input("query", json!("Hello"))
            .with_raw_data("```yaml\nreply: Hello\n```")
            .with_statistics(stats());

        let json = serde_json::to_string(&output).unwrap();
        let deserialized: StepOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, output);
    }

    #[test]
    fn test_failed_output_serializes_error_kind() {
        let output = StepOutput::fatal(StepType::NaturalLanguageToSql, "No requirement found");
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["error"]["kind"], "fatal");
        assert_eq!(value["error"]["message"], "No requirement found");
        assert_eq!(value["step_type"], "natural_language_to_sql");
        assert_eq!(value["terminal"], true);
    }

    #[test]
    fn test_success_output_omits_error() {
        let output = StepOutput::proceed(StepType::QuestionClassification, StepData::new());
        let value = serde_json::to_value(&output).unwrap();
        assert!(value.get("error").is_none());
        assert!(value.get("statistics").is_none());
    }
}
