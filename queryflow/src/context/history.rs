//! Rendering of stored step outputs as assistant turns.

use crate::core::{StepOutput, StepType};

/// Renders what a step contributed to the conversation. Returns an empty
/// string when the step said nothing the user saw.
#[must_use]
pub fn render_step_output(output: &StepOutput) -> String {
    match output.step_type {
        StepType::QuestionClassification if output.terminal => {
            format!("{}\n\n", output.raw_data)
        }
        StepType::QuestionClassification | StepType::ExplainSqlQuery => String::new(),
        StepType::RequirementsExtraction => format!("{}\n\n", output.raw_data),
        StepType::NaturalLanguageToSql => {
            format!("SQL query: {}", output.get_str("sql").unwrap_or_default())
        }
        StepType::DataSummarization => format!(
            "Here's the data summary from executing the previous SQL\n\nData summary: {}",
            output.get_str("data_summary").unwrap_or_default()
        ),
    }
}
