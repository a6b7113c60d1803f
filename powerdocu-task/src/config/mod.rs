//! Task configuration.
//!
//! Everything the pipeline needs from its environment is collected into a
//! [`PipelineConfig`] once, up front:
//! - [`ReleaseSettings`]: which release to fetch
//! - [`ToolOptions`]: the user inputs forwarded to PowerDocu
//! - [`AgentContext`]: pipeline variables of the build agent
//! - retry and stderr policies

mod agent;
mod settings;
mod tool;

pub use agent::{variable_env_name, AgentContext};
pub use settings::{
    ReleaseSettings, DEFAULT_API_BASE_URL, DEFAULT_ASSET_PATTERN, DEFAULT_REPOSITORY, LATEST_TAG,
};
pub use tool::ToolOptions;

use crate::errors::TaskError;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What to do with output on the tool's error stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StderrPolicy {
    /// Any stderr line fails the run, whatever the exit status.
    #[default]
    Fail,
    /// Stderr lines are reported as warnings; only the exit status counts.
    Warn,
}

impl fmt::Display for StderrPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

impl FromStr for StderrPolicy {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "warn" => Ok(Self::Warn),
            other => Err(TaskError::config(format!(
                "unknown stderr policy '{other}', expected 'fail' or 'warn'"
            ))),
        }
    }
}

/// Complete configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Release lookup settings.
    pub release: ReleaseSettings,
    /// Inputs forwarded to the tool.
    pub tool: ToolOptions,
    /// Agent environment snapshot.
    pub agent: AgentContext,
    /// Policy for the retryable stages.
    pub retry: RetryPolicy,
    /// How stderr output of the tool is judged.
    pub stderr_policy: StderrPolicy,
}

impl PipelineConfig {
    /// Creates a configuration with the default retry and stderr policies.
    #[must_use]
    pub fn new(release: ReleaseSettings, tool: ToolOptions, agent: AgentContext) -> Self {
        Self {
            release,
            tool,
            agent,
            retry: RetryPolicy::default(),
            stderr_policy: StderrPolicy::default(),
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the stderr policy.
    #[must_use]
    pub fn with_stderr_policy(mut self, policy: StderrPolicy) -> Self {
        self.stderr_policy = policy;
        self
    }

    /// Validates release settings and tool inputs.
    pub fn validate(&self) -> Result<(), TaskError> {
        self.release.validate()?;
        self.tool.validate()
    }

    /// Directory the release is downloaded to, extracted into and run from.
    #[must_use]
    pub fn working_directory(&self) -> PathBuf {
        self.agent.temp_directory()
    }
}
