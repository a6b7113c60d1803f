//! Pipeline execution.
//!
//! This module provides:
//! - Stage and run state types
//! - Per-stage results and the run summary
//! - The fail-fast [`ReleasePipeline`]

mod orchestrator;
mod result;
mod stage;


pub use orchestrator::{archive_path, judge_outcome, ReleasePipeline};
pub use result::{RunSummary, StageResult, StageStatus};
pub use stage::{PipelineStage, RunState, StageKind};
