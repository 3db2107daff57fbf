//! Structured response parsing.
//!
//! Model replies are expected to carry exactly one fenced block holding a
//! YAML mapping. [`parse_response`] locates the block, validates every
//! declared field of the target record, and either returns a fully
//! populated record or a [`ParseError`] naming the offending fields. The
//! parser never partially applies.

mod schemas;

pub use schemas::{
    ClassificationResponse, ExplanationResponse, RequirementResponse, SqlGenerationResponse,
    SummaryResponse,
};

use crate::core::StepData;
use crate::errors::ParseError;
use serde::{de::DeserializeOwned, Serialize};

const FENCE: &str = "```";

/// The value shape a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A required string. Scalars are accepted and rendered as text.
    String,
    /// A string that may be absent or null.
    OptionalString,
    /// A required boolean. `"true"`/`"false"` strings are accepted.
    Bool,
}

/// A single declared field of a structured response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as emitted by the model.
    pub name: &'static str,
    /// Expected value shape.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Declares a required string field.
    #[must_use]
    pub const fn string(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::String,
        }
    }

    /// Declares an optional string field.
    #[must_use]
    pub const fn optional_string(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::OptionalString,
        }
    }

    /// Declares a boolean field.
    #[must_use]
    pub const fn boolean(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Bool,
        }
    }
}

/// A record the model is asked to emit as a fenced YAML block.
pub trait StructuredResponse: Serialize + DeserializeOwned {
    /// The declared fields, validated before deserialization.
    const FIELDS: &'static [FieldSpec];

    /// Converts the record into step data.
    fn to_data(&self) -> StepData {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => StepData::new(),
        }
    }
}

/// Extracts the body of the first fenced block in `text`.
///
/// The opening fence may carry an info string (`yaml`, `yml`, ...). The
/// closing fence is the first bare fence line indented no deeper than the
/// opening one, so fences nested inside block scalars are kept as content.
/// The body is dedented by its common leading spaces and tabs and ends
/// with a line break, so a trailing block scalar keeps its final newline.
pub fn extract_block(text: &str) -> Result<String, ParseError> {
    let mut lines = text.lines();
    let mut open_indent = None;

    for line in lines.by_ref() {
        let trimmed = line.trim_start();
        if let Some(info) = trimmed.strip_prefix(FENCE) {
            if !info.contains('`') {
                open_indent = Some(line.len() - trimmed.len());
                break;
            }
        }
    }

    let Some(open_indent) = open_indent else {
        return Err(ParseError::new("no fenced block found in response"));
    };

    let mut body = Vec::new();
    let mut closed = false;
    for line in lines {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        if trimmed.trim_end() == FENCE && indent <= open_indent {
            closed = true;
            break;
        }
        body.push(line);
    }

    if !closed {
        return Err(ParseError::new("unterminated fenced block"));
    }

    let mut block = dedent(&body);
    if !body.is_empty() {
        block.push('\n');
    }
    Ok(block)
}

const INDENT: [char; 2] = [' ', '\t'];

// Only ASCII indentation is stripped; other whitespace is content.
fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches(INDENT).len()
}

fn dedent(lines: &[&str]) -> String {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_width(l))
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| {
            if indent_width(l) >= indent {
                &l[indent..]
            } else {
                l.trim_start_matches(INDENT)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses the fenced block of `text` into `T`, validating declared fields.
pub fn parse_response<T: StructuredResponse>(text: &str) -> Result<T, ParseError> {
    let block = extract_block(text)?;
    let document: serde_yaml::Value = serde_yaml::from_str(&block)
        .map_err(|e| ParseError::new(format!("malformed YAML: {e}")))?;

    let serde_yaml::Value::Mapping(mapping) = document else {
        return Err(ParseError::new("fenced block is not a key-value mapping"));
    };

    let mut object = serde_json::Map::new();
    let mut offending = Vec::new();

    for spec in T::FIELDS {
        let value = mapping.get(spec.name);
        match coerce(spec.kind, value) {
            Some(v) => {
                object.insert(spec.name.to_string(), v);
            }
            None => offending.push(spec.name.to_string()),
        }
    }

    if !offending.is_empty() {
        return Err(ParseError::invalid_fields(offending));
    }

    serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| ParseError::new(format!("record construction failed: {e}")))
}

fn coerce(kind: FieldKind, value: Option<&serde_yaml::Value>) -> Option<serde_json::Value> {
    use serde_yaml::Value as Y;

    match kind {
        FieldKind::String => scalar_text(value?).map(serde_json::Value::String),
        FieldKind::OptionalString => match value {
            None | Some(Y::Null) => Some(serde_json::Value::Null),
            Some(v) => scalar_text(v).map(serde_json::Value::String),
        },
        FieldKind::Bool => match value? {
            Y::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Y::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(serde_json::Value::Bool(true)),
                "false" => Some(serde_json::Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
    }
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value as Y;

    match value {
        Y::String(s) => Some(s.clone()),
        Y::Number(n) => Some(n.to_string()),
        Y::Bool(b) => Some(b.to_string()),
        Y::Tagged(tagged) => scalar_text(&tagged.value),
        Y::Null | Y::Sequence(_) | Y::Mapping(_) => None,
    }
}

/// Renders `record` as a fenced YAML block, the format the model is asked
/// to produce.
pub fn render_block<T: Serialize>(record: &T) -> Result<String, ParseError> {
    let yaml = serde_yaml::to_string(record)
        .map_err(|e| ParseError::new(format!("cannot render record: {e}")))?;
    Ok(format!("{FENCE}yaml\n{yaml}{FENCE}"))
}
