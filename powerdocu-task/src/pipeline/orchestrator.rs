//! The release pipeline: resolve, fetch, unpack, run.

use super::{PipelineStage, RunState, RunSummary, StageKind, StageResult};
use crate::archive::ArchiveExtractor;
use crate::config::{PipelineConfig, StderrPolicy};
use crate::errors::{ExecutionError, TaskError};
use crate::fetch::ArtifactFetcher;
use crate::host::{LogLevel, NoOpHost, TaskHost, TaskResult};
use crate::process::{build_invocation, Invocation, ProcessOutcome, ProcessRunner};
use crate::release::{ReleaseAsset, ReleaseResolver};
use crate::retry::RetryExecutor;
use crate::telemetry::{NoOpTelemetry, TelemetryRecord, TelemetryReporter};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

/// Runs the four stages of a task in order, failing fast.
///
/// A pipeline is consumed by [`run`](Self::run), so its terminal state can
/// never be re-entered. Exactly one terminal result is reported to the host
/// per run.
pub struct ReleasePipeline {
    config: PipelineConfig,
    stages: [PipelineStage; 4],
    resolver: Arc<dyn ReleaseResolver>,
    fetcher: Arc<dyn ArtifactFetcher>,
    extractor: Arc<dyn ArchiveExtractor>,
    runner: Arc<dyn ProcessRunner>,
    host: Arc<dyn TaskHost>,
    telemetry: Arc<dyn TelemetryReporter>,
    invocation: Option<Invocation>,
}

impl std::fmt::Debug for ReleasePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleasePipeline")
            .field("config", &self.config)
            .field("stages", &self.stages)
            .field("invocation", &self.invocation)
            .finish_non_exhaustive()
    }
}

impl ReleasePipeline {
    /// Creates a pipeline from its collaborators.
    ///
    /// Diagnostics and telemetry are discarded until a host and a reporter
    /// are set.
    pub fn new(
        config: PipelineConfig,
        resolver: Arc<dyn ReleaseResolver>,
        fetcher: Arc<dyn ArtifactFetcher>,
        extractor: Arc<dyn ArchiveExtractor>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            config,
            stages: StageKind::ALL.map(PipelineStage::new),
            resolver,
            fetcher,
            extractor,
            runner,
            host: Arc::new(NoOpHost),
            telemetry: Arc::new(NoOpTelemetry),
            invocation: None,
        }
    }

    /// Wires the production collaborators for `config`.
    #[cfg(feature = "http")]
    pub fn from_config(config: PipelineConfig, host: Arc<dyn TaskHost>) -> Result<Self, TaskError> {
        use crate::archive::ZipArchiveExtractor;
        use crate::fetch::{FetchOptions, HttpArtifactFetcher};
        use crate::process::TokioProcessRunner;
        use crate::release::GitHubReleaseResolver;
        use crate::telemetry::VsoTelemetryReporter;

        config.validate()?;

        let resolver = GitHubReleaseResolver::new(&config.release)?;
        let fetcher = HttpArtifactFetcher::new(
            &config.release.user_agent(),
            FetchOptions::from_agent(&config.agent),
        )?;
        let telemetry = VsoTelemetryReporter::new(
            Arc::clone(&host),
            config.agent.clone(),
            config.release.version.clone(),
        );

        Ok(Self::new(
            config,
            Arc::new(resolver),
            Arc::new(fetcher),
            Arc::new(ZipArchiveExtractor::new()),
            Arc::new(TokioProcessRunner::new()),
        )
        .with_host(host)
        .with_telemetry(Arc::new(telemetry)))
    }

    /// Sets the host receiving diagnostics and the terminal result.
    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn TaskHost>) -> Self {
        self.host = host;
        self
    }

    /// Sets the failure telemetry reporter.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetryReporter>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Runs `invocation` instead of the PowerShell launch built from the
    /// config.
    #[must_use]
    pub fn with_invocation(mut self, invocation: Invocation) -> Self {
        self.invocation = Some(invocation);
        self
    }

    /// The stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    /// The configuration this pipeline runs with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn stage(&self, kind: StageKind) -> &PipelineStage {
        &self.stages[kind as usize]
    }

    /// Executes the run and reports its outcome.
    ///
    /// The returned summary always carries a terminal state; a failed run
    /// keeps the error of the stage that stopped it.
    pub async fn run(self) -> RunSummary {
        let mut summary = RunSummary::new();
        let span = tracing::info_span!("pipeline_run", run_id = %summary.run_id);

        let outcome = self.execute(&mut summary).instrument(span).await;

        match outcome {
            Ok(()) => {
                summary.state = RunState::Succeeded;
                tracing::info!(run_id = %summary.run_id, state = %summary.state, "Pipeline completed");
                self.host.set_result(TaskResult::Succeeded, "");
            }
            Err(err) => {
                summary.state = RunState::Failed;
                tracing::error!(
                    run_id = %summary.run_id,
                    state = %summary.state,
                    error = %err,
                    "Pipeline failed"
                );
                self.publish_failure(&err);
                self.host.set_result(TaskResult::Failed, &err.to_string());
                summary.error = Some(err);
            }
        }

        summary
    }

    async fn execute(&self, summary: &mut RunSummary) -> Result<(), TaskError> {
        let retry = RetryExecutor::new(self.config.retry).with_host(Arc::clone(&self.host));

        let asset = self
            .run_stage(summary, &retry, StageKind::Resolve, || self.resolver.resolve())
            .await?;
        self.host.log(
            LogLevel::Command,
            &format!("PowerDocu release found: {}", asset.version),
        );
        summary.release = Some(asset.clone());

        let working_directory = self.config.working_directory();
        let archive = match archive_path(&working_directory, &asset) {
            Ok(archive) => archive,
            Err(err) => {
                let started_at = self.start_stage(summary, StageKind::Fetch);
                self.finish_stage(summary, StageKind::Fetch, started_at, Err(&err));
                return Err(err);
            }
        };
        self.run_stage(summary, &retry, StageKind::Fetch, || {
            self.fetcher.fetch(&asset.download_url, &archive)
        })
        .await?;

        self.run_stage(summary, &retry, StageKind::Unpack, || {
            self.extractor.extract(&archive, &working_directory)
        })
        .await?;

        let invocation = self
            .invocation
            .clone()
            .unwrap_or_else(|| build_invocation(&self.config));
        self.run_stage(summary, &retry, StageKind::Run, || self.run_tool(&invocation))
            .await
    }

    async fn run_stage<T, F, Fut>(
        &self,
        summary: &mut RunSummary,
        retry: &RetryExecutor,
        kind: StageKind,
        mut operation: F,
    ) -> Result<T, TaskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        let started_at = self.start_stage(summary, kind);
        let result = if self.stage(kind).retryable {
            retry.execute(&self.stage(kind).name, operation).await
        } else {
            operation().await
        };
        self.finish_stage(summary, kind, started_at, result.as_ref().map(|_| ()));

        result
    }

    fn start_stage(&self, summary: &mut RunSummary, kind: StageKind) -> DateTime<Utc> {
        summary.state = kind.running_state();
        tracing::info!(stage = %self.stage(kind).name, state = %summary.state, "Stage started");
        Utc::now()
    }

    fn finish_stage(
        &self,
        summary: &mut RunSummary,
        kind: StageKind,
        started_at: DateTime<Utc>,
        outcome: Result<(), &TaskError>,
    ) {
        let stage = self.stage(kind);
        match outcome {
            Ok(()) => {
                let record = StageResult::completed(&stage.name, kind, started_at);
                tracing::info!(stage = %stage.name, duration_ms = record.duration_ms(), "Stage completed");
                summary.stage_results.push(record);
            }
            Err(err) => {
                tracing::error!(stage = %stage.name, error = %err, "Stage failed");
                summary
                    .stage_results
                    .push(StageResult::failed(&stage.name, kind, started_at, err.to_string()));
            }
        }
    }

    async fn run_tool(&self, invocation: &Invocation) -> Result<(), TaskError> {
        self.config.tool.log_inputs(self.host.as_ref());
        self.host.log(LogLevel::Debug, &format!("Running {invocation}"));

        let outcome = self.runner.run(invocation, self.host.as_ref()).await?;
        judge_outcome(outcome, self.config.stderr_policy, self.host.as_ref())?;
        Ok(())
    }

    fn publish_failure(&self, err: &TaskError) {
        let record = TelemetryRecord::error(err);
        if let Err(telemetry_err) = self.telemetry.report(&record) {
            tracing::warn!(error = %telemetry_err, "Failed to log telemetry");
            self.host.log(
                LogLevel::Warning,
                &format!("Failed to log telemetry, error: {telemetry_err}"),
            );
        }
    }
}

/// Where the downloaded asset is stored inside `directory`.
///
/// Only the final component of the asset name is used, so a crafted name
/// cannot place the download elsewhere.
pub fn archive_path(directory: &Path, asset: &ReleaseAsset) -> Result<PathBuf, TaskError> {
    Path::new(&asset.filename)
        .file_name()
        .map(|name| directory.join(name))
        .ok_or_else(|| {
            TaskError::transfer(format!("asset name '{}' is not a file name", asset.filename))
        })
}

/// Decides whether a finished tool run succeeded.
///
/// Every stderr line is logged on its own first: as an error under
/// [`StderrPolicy::Fail`], as a warning under [`StderrPolicy::Warn`]. A
/// non-zero exit or death by signal always fails. Under `Fail`, any stderr
/// output fails even a zero exit.
pub fn judge_outcome(
    outcome: ProcessOutcome,
    policy: StderrPolicy,
    host: &dyn TaskHost,
) -> Result<(), ExecutionError> {
    let level = match policy {
        StderrPolicy::Fail => LogLevel::Error,
        StderrPolicy::Warn => LogLevel::Warning,
    };
    for line in &outcome.stderr_lines {
        host.log(level, line);
    }

    match outcome.exit_code {
        Some(0) => {}
        Some(code) => return Err(ExecutionError::NonZeroExit { code }),
        None => return Err(ExecutionError::Terminated),
    }

    if policy == StderrPolicy::Fail && !outcome.stderr_lines.is_empty() {
        return Err(ExecutionError::Stderr {
            lines: outcome.stderr_lines,
        });
    }
    Ok(())
}
