//! Running the PowerDocu executable.
//!
//! The tool is started through PowerShell from the directory it was
//! extracted into. Its standard output is echoed to the host line by line;
//! its error stream is collected so the pipeline can judge it once the
//! process has exited.

mod runner;

pub use runner::TokioProcessRunner;

use crate::config::PipelineConfig;
use crate::errors::ExecutionError;
use crate::host::TaskHost;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// File name of the executable inside the release archive.
pub const TOOL_EXECUTABLE: &str = "PowerDocu.CLI.exe";

/// Preferred PowerShell launchers, in lookup order.
pub const LAUNCHERS: [&str; 2] = ["pwsh", "powershell"];

/// A fully specified process launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to start.
    pub program: PathBuf,
    /// Arguments, unquoted.
    pub args: Vec<String>,
    /// Working directory; inherits the current one when `None`.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    /// Creates an invocation in the current directory.
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit status; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Every line written to stderr, in order.
    pub stderr_lines: Vec<String>,
}

impl ProcessOutcome {
    /// An outcome with the given exit code and no stderr output.
    #[must_use]
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            stderr_lines: Vec::new(),
        }
    }

    /// Adds stderr lines.
    #[must_use]
    pub fn with_stderr<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stderr_lines.extend(lines.into_iter().map(Into::into));
        self
    }
}

/// Starts a process and waits for it.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs `invocation` to completion.
    ///
    /// Standard output is forwarded to `host` as it arrives. Only a failure
    /// to start or wait for the process is an error; the exit status and
    /// stderr are returned for the caller to judge.
    async fn run(
        &self,
        invocation: &Invocation,
        host: &dyn TaskHost,
    ) -> Result<ProcessOutcome, ExecutionError>;
}

/// The first PowerShell found on `PATH`, or `powershell` when none is.
#[must_use]
pub fn find_launcher() -> PathBuf {
    LAUNCHERS
        .iter()
        .find_map(|name| which::which(name).ok())
        .unwrap_or_else(|| PathBuf::from(LAUNCHERS[1]))
}

/// Builds the tool invocation with the launcher found on `PATH`.
#[must_use]
pub fn build_invocation(config: &PipelineConfig) -> Invocation {
    build_invocation_with(find_launcher(), config)
}

/// Builds the tool invocation for an explicit launcher.
#[must_use]
pub fn build_invocation_with(launcher: impl Into<PathBuf>, config: &PipelineConfig) -> Invocation {
    let mut args = vec![
        "-NoLogo".to_string(),
        "-NoProfile".to_string(),
        "-NonInteractive".to_string(),
        format!(".\\{TOOL_EXECUTABLE}"),
    ];
    args.extend(config.tool.tool_arguments());

    Invocation::new(launcher, args).with_cwd(config.working_directory())
}
