//! A host that keeps everything it is told.

use crate::host::{LogLevel, TaskHost, TaskResult};
use parking_lot::RwLock;

/// Records diagnostics, results and raw commands for assertions.
#[derive(Debug, Default)]
pub struct CollectingHost {
    lines: RwLock<Vec<(LogLevel, String)>>,
    results: RwLock<Vec<(TaskResult, String)>>,
    commands: RwLock<Vec<String>>,
}

impl CollectingHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every diagnostic line, in order.
    #[must_use]
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.read().clone()
    }

    /// Messages logged at `level`, in order.
    #[must_use]
    pub fn lines_at(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .read()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Every terminal result reported.
    #[must_use]
    pub fn results(&self) -> Vec<(TaskResult, String)> {
        self.results.read().clone()
    }

    /// Every raw command emitted.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.commands.read().clone()
    }
}

impl TaskHost for CollectingHost {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines.write().push((level, message.to_string()));
    }

    fn set_result(&self, result: TaskResult, message: &str) {
        self.results.write().push((result, message.to_string()));
    }

    fn emit_command(&self, command: &str) {
        self.commands.write().push(command.to_string());
    }
}
