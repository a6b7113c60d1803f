//! Stage and run state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of work a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Look up the release asset.
    Resolve,
    /// Download the asset.
    Fetch,
    /// Extract the archive.
    Unpack,
    /// Run the tool.
    Run,
}

impl StageKind {
    /// Every stage kind, in execution order.
    pub const ALL: [Self; 4] = [Self::Resolve, Self::Fetch, Self::Unpack, Self::Run];

    /// Whether stages of this kind are retried by default.
    ///
    /// Only network-bound work is; the tool run may have side effects.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Resolve | Self::Fetch)
    }

    /// Operation name used in diagnostics.
    #[must_use]
    pub fn operation_name(self) -> &'static str {
        match self {
            Self::Resolve => "GetRelease",
            Self::Fetch => "DownloadRelease",
            Self::Unpack => "UnzipRelease",
            Self::Run => "RunPowerDocu",
        }
    }

    /// The run state while a stage of this kind executes.
    #[must_use]
    pub fn running_state(self) -> RunState {
        match self {
            Self::Resolve => RunState::Resolving,
            Self::Fetch => RunState::Fetching,
            Self::Unpack => RunState::Unpacking,
            Self::Run => RunState::Running,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => write!(f, "resolve"),
            Self::Fetch => write!(f, "fetch"),
            Self::Unpack => write!(f, "unpack"),
            Self::Run => write!(f, "run"),
        }
    }
}

/// One step of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    /// Diagnostic name.
    pub name: String,
    /// What the stage does.
    pub kind: StageKind,
    /// Whether failures are retried under the pipeline's policy.
    pub retryable: bool,
}

impl PipelineStage {
    /// Creates a stage with the default name and retry behavior for `kind`.
    #[must_use]
    pub fn new(kind: StageKind) -> Self {
        Self {
            name: kind.operation_name().to_string(),
            kind,
            retryable: kind.is_retryable(),
        }
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not started.
    #[default]
    Idle,
    /// Looking up the release.
    Resolving,
    /// Downloading the release.
    Fetching,
    /// Extracting the release.
    Unpacking,
    /// Running the tool.
    Running,
    /// Every stage completed.
    Succeeded,
    /// A stage failed.
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resolving => write!(f, "resolving"),
            Self::Fetching => write!(f, "fetching"),
            Self::Unpacking => write!(f, "unpacking"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl RunState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::Resolve.to_string(), "resolve");
        assert_eq!(StageKind::Run.to_string(), "run");
    }

    #[test]
    fn test_only_network_stages_retry() {
        let retryable: Vec<_> = StageKind::ALL
            .into_iter()
            .filter(|kind| kind.is_retryable())
            .collect();
        assert_eq!(retryable, vec![StageKind::Resolve, StageKind::Fetch]);
    }

    #[test]
    fn test_pipeline_stage_defaults() {
        let stage = PipelineStage::new(StageKind::Fetch);
        assert_eq!(stage.name, "DownloadRelease");
        assert!(stage.retryable);
        assert!(!PipelineStage::new(StageKind::Run).retryable);
    }

    #[test]
    fn test_run_state_terminal() {
        assert!(RunState::Succeeded.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert_eq!(StageKind::Unpack.running_state(), RunState::Unpacking);
    }
}
