//! Test fixtures for pipeline testing.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::{CollectingHost, RecordingExtractor, RecordingFetcher, RecordingTelemetry, ScriptedRunner, StaticResolver};
use crate::config::{AgentContext, PipelineConfig, ReleaseSettings, ToolOptions};
use crate::pipeline::ReleasePipeline;
use crate::process::Invocation;
use crate::release::ReleaseAsset;
use crate::retry::RetryPolicy;

/// The asset every fixture resolves to.
#[must_use]
pub fn sample_asset() -> ReleaseAsset {
    ReleaseAsset::new("https://example/a.zip", "a.zip", "1.2.3")
}

/// A valid configuration working in `temp_dir`, with immediate retries.
#[must_use]
pub fn sample_config(temp_dir: &Path) -> PipelineConfig {
    let agent = AgentContext::default()
        .with_variable("Agent.TempDirectory", temp_dir.display().to_string())
        .with_variable("Agent.Version", "3.220.5");

    PipelineConfig::new(ReleaseSettings::default(), ToolOptions::new("flows"), agent)
        .with_retry_policy(RetryPolicy::default().with_delay(Duration::ZERO))
}

/// A pipeline wired entirely to recording collaborators.
///
/// Every collaborator is reachable through the fixture, so tests can swap
/// one and inspect the rest.
#[derive(Debug)]
pub struct TestPipeline {
    /// Configuration the pipeline is built with.
    pub config: PipelineConfig,
    /// Release lookup.
    pub resolver: Arc<StaticResolver>,
    /// Download.
    pub fetcher: Arc<RecordingFetcher>,
    /// Extraction.
    pub extractor: Arc<RecordingExtractor>,
    /// Tool run.
    pub runner: Arc<ScriptedRunner>,
    /// Host receiving diagnostics.
    pub host: Arc<CollectingHost>,
    /// Telemetry sink.
    pub telemetry: Arc<RecordingTelemetry>,
}

impl TestPipeline {
    /// Creates a fixture where every stage succeeds.
    #[must_use]
    pub fn new(temp_dir: &Path) -> Self {
        Self {
            config: sample_config(temp_dir),
            resolver: Arc::new(StaticResolver::new(sample_asset())),
            fetcher: Arc::new(RecordingFetcher::new()),
            extractor: Arc::new(RecordingExtractor::new()),
            runner: Arc::new(ScriptedRunner::succeeding()),
            host: Arc::new(CollectingHost::new()),
            telemetry: Arc::new(RecordingTelemetry::new()),
        }
    }

    /// Replaces the resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: StaticResolver) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Replaces the fetcher.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: RecordingFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    /// Replaces the extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: RecordingExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Replaces the process runner.
    #[must_use]
    pub fn with_runner(mut self, runner: ScriptedRunner) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    /// Builds the pipeline, with a fixed invocation so no launcher lookup
    /// happens.
    #[must_use]
    pub fn build(&self) -> ReleasePipeline {
        ReleasePipeline::new(
            self.config.clone(),
            self.resolver.clone(),
            self.fetcher.clone(),
            self.extractor.clone(),
            self.runner.clone(),
        )
        .with_host(self.host.clone())
        .with_telemetry(self.telemetry.clone())
        .with_invocation(Invocation::new("pwsh", ["-NoLogo"]))
    }
}
