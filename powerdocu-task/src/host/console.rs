//! Host that speaks the agent's logging-command protocol on a writer.

use super::{LogLevel, TaskHost, TaskResult};
use parking_lot::Mutex;
use std::io::Write;

/// Escapes a command's message body.
#[must_use]
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%AZP25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escapes a command property value.
#[must_use]
pub fn escape_property(value: &str) -> String {
    escape_data(value).replace(']', "%5D").replace(';', "%3B")
}

/// A host writing logging commands to stdout (or any writer).
#[derive(Debug)]
pub struct ConsoleHost<W: Write + Send = std::io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleHost<std::io::Stdout> {
    /// Creates a host writing to the process stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl Default for ConsoleHost<std::io::Stdout> {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<W: Write + Send> ConsoleHost<W> {
    /// Creates a host writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consumes the host and returns the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock();
        // The agent may have closed the pipe; nothing useful can be done then.
        if writeln!(out, "{line}").and_then(|()| out.flush()).is_err() {
            tracing::debug!(line, "Dropped host output line");
        }
    }
}

/// Formats one diagnostic line for the agent.
#[must_use]
pub fn format_log_line(level: LogLevel, message: &str) -> String {
    match level {
        LogLevel::Debug => format!("##vso[task.debug]{}", escape_data(message)),
        LogLevel::Command => format!("##[command]{message}"),
        LogLevel::Info => message.to_string(),
        LogLevel::Warning => format!("##vso[task.issue type=warning;]{}", escape_data(message)),
        LogLevel::Error => format!("##vso[task.issue type=error;]{}", escape_data(message)),
    }
}

impl<W: Write + Send> TaskHost for ConsoleHost<W> {
    fn log(&self, level: LogLevel, message: &str) {
        tracing::trace!(%level, message, "Host log");
        self.write_line(&format_log_line(level, message));
    }

    fn set_result(&self, result: TaskResult, message: &str) {
        if result == TaskResult::Failed && !message.is_empty() {
            self.log(LogLevel::Error, message);
        }
        self.write_line(&format!(
            "##vso[task.complete result={result};done=true;]{}",
            escape_data(message)
        ));
    }

    fn emit_command(&self, command: &str) {
        self.write_line(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn output(host: ConsoleHost<Vec<u8>>) -> String {
        String::from_utf8(host.into_inner()).unwrap()
    }

    #[test]
    fn test_escape_data() {
        assert_eq!(escape_data("50%\r\nnext"), "50%AZP25%0D%0Anext");
    }

    #[test]
    fn test_escape_property() {
        assert_eq!(escape_property("a;b]c"), "a%3Bb%5Dc");
    }

    #[test]
    fn test_log_levels_are_formatted() {
        let host = ConsoleHost::new(Vec::new());
        host.log(LogLevel::Command, "itemsToDocument=flows");
        host.log(LogLevel::Warning, "retrying");
        host.log(LogLevel::Error, "line one\nline two");

        assert_eq!(
            output(host),
            "##[command]itemsToDocument=flows\n\
             ##vso[task.issue type=warning;]retrying\n\
             ##vso[task.issue type=error;]line one%0Aline two\n"
        );
    }

    #[test]
    fn test_failed_result_also_logs_error() {
        let host = ConsoleHost::new(Vec::new());
        host.set_result(TaskResult::Failed, "download failed");

        assert_eq!(
            output(host),
            "##vso[task.issue type=error;]download failed\n\
             ##vso[task.complete result=Failed;done=true;]download failed\n"
        );
    }

    #[test]
    fn test_succeeded_result() {
        let host = ConsoleHost::new(Vec::new());
        host.set_result(TaskResult::Succeeded, "");
        assert_eq!(output(host), "##vso[task.complete result=Succeeded;done=true;]\n");
    }
}
