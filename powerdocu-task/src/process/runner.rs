//! Process execution on tokio.

use super::{Invocation, ProcessOutcome, ProcessRunner};
use crate::errors::ExecutionError;
use crate::host::{LogLevel, TaskHost};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Runs processes with piped output streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// Creates a new runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        host: &dyn TaskHost,
    ) -> Result<ProcessOutcome, ExecutionError> {
        let program = invocation.program.display().to_string();

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        let mut child = command
            .spawn()
            .map_err(|e| ExecutionError::launch(&program, e.to_string()))?;
        tracing::debug!(pid = ?child.id(), command = %invocation, "Process spawned");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutionError::launch(&program, "stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecutionError::launch(&program, "stderr not captured"))?;

        let forward_stdout = drain_lines(stdout, "stdout", |line| {
            host.log(LogLevel::Command, &line);
        });

        let collect_stderr = async {
            let mut collected = Vec::new();
            drain_lines(stderr, "stderr", |line| {
                tracing::debug!(line = %line, "stderr");
                collected.push(line);
            })
            .await;
            collected
        };

        let ((), stderr_lines) = tokio::join!(forward_stdout, collect_stderr);

        let status = child
            .wait()
            .await
            .map_err(|e| ExecutionError::launch(&program, format!("wait failed: {e}")))?;
        tracing::debug!(status = %status, stderr_lines = stderr_lines.len(), "Process exited");

        Ok(ProcessOutcome {
            exit_code: status.code(),
            stderr_lines,
        })
    }
}

/// Reads `stream` to the end, handing each line to `on_line`.
///
/// Lines are split on raw `\n` bytes and decoded lossily, so output in a
/// legacy codepage still arrives (with replacement characters) and the pipe
/// stays drained.
async fn drain_lines<R>(stream: R, name: &str, mut on_line: impl FnMut(String))
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => on_line(decode_line(&buf)),
            Err(e) => {
                if !buf.is_empty() {
                    on_line(decode_line(&buf));
                }
                tracing::warn!(stream = name, error = %e, "Stopped reading process output");
                break;
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
