//! The pipeline orchestrator as seen from inside the task.
//!
//! The agent that launched the task receives diagnostic lines, one terminal
//! result and raw logging commands (telemetry). [`TaskHost`] is the seam for
//! all of that so the pipeline can be driven against a console, a collector
//! in tests, or nothing at all.

mod console;

pub use console::{escape_data, escape_property, format_log_line, ConsoleHost};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic line sent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only shown when the pipeline runs with debugging enabled.
    Debug,
    /// Echo of a command or of tool output.
    Command,
    /// Plain informational output.
    Info,
    /// A warning issue.
    Warning,
    /// An error issue.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Command => write!(f, "command"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The terminal result of a task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskResult {
    /// The run completed successfully.
    Succeeded,
    /// The run failed.
    Failed,
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// The hosting orchestrator.
///
/// Implementations must not panic or fail: reporting is best effort and can
/// never replace the outcome being reported.
pub trait TaskHost: Send + Sync {
    /// Writes one diagnostic line.
    fn log(&self, level: LogLevel, message: &str);

    /// Reports the terminal result of the run.
    fn set_result(&self, result: TaskResult, message: &str);

    /// Writes a raw logging command, such as a telemetry record.
    fn emit_command(&self, command: &str);
}

/// A host that discards everything.
///
/// Used as the default when no host is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHost;

impl TaskHost for NoOpHost {
    fn log(&self, _level: LogLevel, _message: &str) {}

    fn set_result(&self, _result: TaskResult, _message: &str) {}

    fn emit_command(&self, _command: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Warning.to_string(), "warning");
        assert_eq!(LogLevel::Command.to_string(), "command");
    }

    #[test]
    fn test_log_level_serialize() {
        let json = serde_json::to_string(&LogLevel::Error).unwrap();
        assert_eq!(json, r#""error""#);
    }

    #[test]
    fn test_noop_host() {
        let host = NoOpHost;
        host.log(LogLevel::Error, "ignored");
        host.set_result(TaskResult::Failed, "ignored");
        host.emit_command("##vso[task.debug]ignored");
    }
}
