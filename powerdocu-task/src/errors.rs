//! Error types for the PowerDocu task.
//!
//! Each pipeline stage has its own variant so callers can tell a failed
//! release lookup from a failed download or a failed tool run. Errors are
//! never re-wrapped as they cross the retry boundary or the pipeline.

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for task operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The release lookup failed or no matching asset was found.
    #[error("Release resolution failed: {0}")]
    Resolution(String),

    /// Downloading the release asset failed.
    #[error("Release download failed: {0}")]
    Transfer(String),

    /// The downloaded archive could not be extracted.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The bundled executable failed.
    #[error("{0}")]
    Execution(#[from] ExecutionError),

    /// The task inputs or settings are invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A telemetry record could not be built or emitted.
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl TaskError {
    /// Creates a resolution error.
    #[must_use]
    pub fn resolution(reason: impl Into<String>) -> Self {
        Self::Resolution(reason.into())
    }

    /// Creates a transfer error.
    #[must_use]
    pub fn transfer(reason: impl Into<String>) -> Self {
        Self::Transfer(reason.into())
    }

    /// Creates an extraction error.
    #[must_use]
    pub fn extraction(reason: impl Into<String>) -> Self {
        Self::Extraction(reason.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resolution(_) => "ResolutionError",
            Self::Transfer(_) => "TransferError",
            Self::Extraction(_) => "ExtractionError",
            Self::Execution(_) => "ExecutionError",
            Self::Config(_) => "ConfigError",
            Self::Telemetry(_) => "TelemetryError",
            Self::Serialization(_) => "SerializationError",
            Self::Io(_) => "IoError",
        }
    }

    /// Converts to a dictionary representation.
    ///
    /// This is the serialized form published with reliability telemetry.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        if let Self::Execution(inner) = self {
            match inner {
                ExecutionError::NonZeroExit { code } => {
                    map.insert("exitCode".to_string(), serde_json::json!(code));
                }
                ExecutionError::Stderr { lines } => {
                    map.insert("stderr".to_string(), serde_json::json!(lines));
                }
                ExecutionError::Launch { program, .. } => {
                    map.insert("program".to_string(), serde_json::json!(program));
                }
                ExecutionError::Terminated => {}
            }
        }

        map
    }
}

/// Failures of the executable-invocation stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The process exited with a non-zero status.
    #[error("PowerDocu exited with code {code}")]
    NonZeroExit {
        /// The exit status.
        code: i32,
    },

    /// The process was killed before it could report an exit status.
    #[error("PowerDocu was terminated by a signal")]
    Terminated,

    /// The process wrote to its error stream.
    #[error("PowerDocu reported {} error line(s): {}", lines.len(), lines.join("; "))]
    Stderr {
        /// Every line written to stderr, in order.
        lines: Vec<String>,
    },

    /// The process could not be started.
    #[error("Failed to launch {program}: {reason}")]
    Launch {
        /// The program that was launched.
        program: String,
        /// Why the launch failed.
        reason: String,
    },
}

impl ExecutionError {
    /// Creates a launch error.
    #[must_use]
    pub fn launch(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Launch {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_keeps_reason() {
        let err = TaskError::resolution("no asset matching 'selfcontained'");
        assert_eq!(
            err.to_string(),
            "Release resolution failed: no asset matching 'selfcontained'"
        );
        assert_eq!(err.kind(), "ResolutionError");
    }

    #[test]
    fn test_execution_error_is_not_rewrapped() {
        let err: TaskError = ExecutionError::NonZeroExit { code: 3 }.into();
        assert_eq!(err.to_string(), "PowerDocu exited with code 3");
    }

    #[test]
    fn test_stderr_error_lists_lines() {
        let err = ExecutionError::Stderr {
            lines: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "PowerDocu reported 2 error line(s): first; second"
        );
    }

    #[test]
    fn test_to_dict_includes_execution_details() {
        let err: TaskError = ExecutionError::Stderr {
            lines: vec!["boom".to_string()],
        }
        .into();

        let dict = err.to_dict();
        assert_eq!(dict.get("kind").unwrap(), "ExecutionError");
        assert_eq!(dict.get("stderr").unwrap(), &serde_json::json!(["boom"]));
    }

    #[test]
    fn test_json_error_converts_to_serialization() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TaskError = parse.into();
        assert_eq!(err.kind(), "SerializationError");
    }
}
