//! Testing utilities for the release pipeline.
//!
//! This module provides:
//! - A host that records diagnostics and results
//! - Scripted collaborators for every pipeline stage
//! - Fixtures and assertions for whole runs

mod assertions;
mod fixtures;
mod host;
mod mocks;

pub use assertions::{
    assert_logged, assert_run_failed_at, assert_run_succeeded, assert_single_result,
};
pub use fixtures::{sample_asset, sample_config, TestPipeline};
pub use host::CollectingHost;
pub use mocks::{
    FailingTelemetry, RecordingExtractor, RecordingFetcher, RecordingTelemetry, ScriptedRunner,
    StaticResolver,
};
