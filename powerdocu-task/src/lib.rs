//! # PowerDocu task
//!
//! A build-pipeline task that documents Power Platform flows and apps with
//! [PowerDocu](https://github.com/modery/PowerDocu).
//!
//! A run goes through four fixed stages and stops at the first failure:
//!
//! - **Resolve**: look up the configured release and pick its self-contained
//!   asset (retried)
//! - **Fetch**: download the asset into the agent's temp directory (retried)
//! - **Unpack**: extract the archive in place
//! - **Run**: start `PowerDocu.CLI.exe` through PowerShell and judge its exit
//!   status and error stream
//!
//! The agent sees one terminal result per run, and a failed run publishes a
//! reliability telemetry record.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use powerdocu_task::prelude::*;
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::new(
//!     ReleaseSettings::default(),
//!     ToolOptions::new("solution.zip"),
//!     AgentContext::from_env(),
//! );
//! let host: Arc<dyn TaskHost> = Arc::new(ConsoleHost::stdout());
//!
//! let summary = ReleasePipeline::from_config(config, host)?.run().await;
//! assert!(summary.is_success());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod archive;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod host;
pub mod pipeline;
pub mod process;
pub mod release;
pub mod retry;
pub mod telemetry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::archive::{ArchiveExtractor, ZipArchiveExtractor};
    pub use crate::config::{
        AgentContext, PipelineConfig, ReleaseSettings, StderrPolicy, ToolOptions,
    };
    pub use crate::errors::{ExecutionError, TaskError};
    pub use crate::fetch::{ArtifactFetcher, FetchOptions};
    pub use crate::host::{ConsoleHost, LogLevel, NoOpHost, TaskHost, TaskResult};
    pub use crate::pipeline::{
        PipelineStage, ReleasePipeline, RunState, RunSummary, StageKind, StageResult,
    };
    pub use crate::process::{Invocation, ProcessOutcome, ProcessRunner, TokioProcessRunner};
    pub use crate::release::{ReleaseAsset, ReleaseResolver};
    pub use crate::retry::{retry_operation, Operation, RetryExecutor, RetryPolicy};
    pub use crate::telemetry::{TelemetryRecord, TelemetryReporter, VsoTelemetryReporter};

    #[cfg(feature = "http")]
    pub use crate::fetch::HttpArtifactFetcher;
    #[cfg(feature = "http")]
    pub use crate::release::GitHubReleaseResolver;
}
