//! Observability utilities.
//!
//! Logging goes through `tracing`. Binaries embedding the pipeline call
//! [`init_tracing`] once; libraries and tests leave the subscriber alone.

mod spans;

pub use spans::{pipeline_span, step_span, SpanTimer};

use crate::errors::QueryflowError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

/// Installs a global `fmt` subscriber.
///
/// The filter comes from `RUST_LOG` when set, `default_filter` otherwise
/// (for example `"queryflow=info"`). Fails if a subscriber is already set.
pub fn init_tracing(format: LogFormat, default_filter: &str) -> Result<(), QueryflowError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| QueryflowError::Config(format!("invalid log filter: {e}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| QueryflowError::Config(format!("tracing already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_config() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Plain);
    }

    #[test]
    fn test_init_twice_fails() {
        let _ = init_tracing(LogFormat::Plain, "queryflow=debug");
        assert!(init_tracing(LogFormat::Json, "queryflow=debug").is_err());
    }
}
