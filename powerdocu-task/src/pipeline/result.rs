//! Results of stages and runs.

use super::{RunState, StageKind};
use crate::errors::TaskError;
use crate::release::ReleaseAsset;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal status of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Stage completed successfully.
    Completed,
    /// Stage failed.
    Failed,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Record of one executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub name: String,
    /// Stage kind.
    pub kind: StageKind,
    /// Stage status.
    pub status: StageStatus,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    /// Creates a completed stage result ending now.
    #[must_use]
    pub fn completed(name: impl Into<String>, kind: StageKind, started_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            kind,
            status: StageStatus::Completed,
            started_at,
            ended_at: Utc::now(),
            error: None,
        }
    }

    /// Creates a failed stage result ending now.
    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        kind: StageKind,
        started_at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            status: StageStatus::Failed,
            started_at,
            ended_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, StageStatus::Completed)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// The resolved release, once the resolve stage succeeded.
    pub release: Option<ReleaseAsset>,
    /// Executed stages, in order.
    pub stage_results: Vec<StageResult>,
    /// Final state.
    pub state: RunState,
    /// The error that stopped the run.
    #[serde(skip)]
    pub error: Option<TaskError>,
}

impl RunSummary {
    /// Creates an idle summary with a fresh run id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            release: None,
            stage_results: Vec::new(),
            state: RunState::Idle,
            error: None,
        }
    }

    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }

    /// The stage that failed, if any.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&StageResult> {
        self.stage_results.iter().find(|r| !r.is_success())
    }

    /// Kinds of every stage that executed, in order.
    #[must_use]
    pub fn executed_kinds(&self) -> Vec<StageKind> {
        self.stage_results.iter().map(|r| r.kind).collect()
    }

    /// Splits off the error, turning a failed run into `Err`.
    pub fn into_result(mut self) -> Result<Self, TaskError> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
