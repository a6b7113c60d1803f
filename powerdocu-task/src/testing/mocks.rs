//! Scripted collaborators for pipeline tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveExtractor;
use crate::errors::{ExecutionError, TaskError};
use crate::fetch::ArtifactFetcher;
use crate::host::{LogLevel, TaskHost};
use crate::process::{Invocation, ProcessOutcome, ProcessRunner};
use crate::release::{ReleaseAsset, ReleaseResolver};
use crate::telemetry::{TelemetryRecord, TelemetryReporter};

/// A resolver returning a fixed asset after an optional run of failures.
#[derive(Debug)]
pub struct StaticResolver {
    asset: ReleaseAsset,
    failures: Mutex<VecDeque<TaskError>>,
    always_fail: Option<String>,
    call_count: Mutex<usize>,
}

impl StaticResolver {
    /// Creates a resolver that always returns `asset`.
    #[must_use]
    pub fn new(asset: ReleaseAsset) -> Self {
        Self {
            asset,
            failures: Mutex::new(VecDeque::new()),
            always_fail: None,
            call_count: Mutex::new(0),
        }
    }

    /// Creates a resolver failing every call with `reason`.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            always_fail: Some(reason.into()),
            ..Self::new(ReleaseAsset::new("", "", ""))
        }
    }

    /// Fails the first calls with `errors`, in order.
    #[must_use]
    pub fn with_failures(self, errors: impl IntoIterator<Item = TaskError>) -> Self {
        self.failures.lock().extend(errors);
        self
    }

    /// Returns the number of times the resolver was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl ReleaseResolver for StaticResolver {
    async fn resolve(&self) -> Result<ReleaseAsset, TaskError> {
        *self.call_count.lock() += 1;
        if let Some(reason) = &self.always_fail {
            return Err(TaskError::resolution(reason.clone()));
        }
        match self.failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(self.asset.clone()),
        }
    }
}

/// A fetcher that records requests without touching the network.
#[derive(Debug, Default)]
pub struct RecordingFetcher {
    requests: Mutex<Vec<(String, PathBuf)>>,
    failures: Mutex<VecDeque<TaskError>>,
    always_fail: Option<String>,
}

impl RecordingFetcher {
    /// Creates a fetcher that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher failing every call with `reason`.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            always_fail: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Fails the first calls with `errors`, in order.
    #[must_use]
    pub fn with_failures(self, errors: impl IntoIterator<Item = TaskError>) -> Self {
        self.failures.lock().extend(errors);
        self
    }

    /// Every `(url, target)` requested, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<(String, PathBuf)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ArtifactFetcher for RecordingFetcher {
    async fn fetch(&self, url: &str, target: &Path) -> Result<u64, TaskError> {
        self.requests
            .lock()
            .push((url.to_string(), target.to_path_buf()));
        if let Some(reason) = &self.always_fail {
            return Err(TaskError::transfer(reason.clone()));
        }
        match self.failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(0),
        }
    }
}

/// An extractor that records calls and extracts nothing.
#[derive(Debug, Default)]
pub struct RecordingExtractor {
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
    failure: Option<String>,
}

impl RecordingExtractor {
    /// Creates an extractor that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an extractor failing every call with `reason`.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Every `(archive, destination)` extracted, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ArchiveExtractor for RecordingExtractor {
    async fn extract(&self, archive: &Path, destination: &Path) -> Result<usize, TaskError> {
        self.calls
            .lock()
            .push((archive.to_path_buf(), destination.to_path_buf()));
        match &self.failure {
            Some(reason) => Err(TaskError::extraction(reason.clone())),
            None => Ok(0),
        }
    }
}

/// A process runner replaying a fixed outcome.
#[derive(Debug)]
pub struct ScriptedRunner {
    outcome: Result<ProcessOutcome, ExecutionError>,
    stdout: Vec<String>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Creates a runner whose process exits with `outcome`.
    #[must_use]
    pub fn new(outcome: ProcessOutcome) -> Self {
        Self {
            outcome: Ok(outcome),
            stdout: Vec::new(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Creates a runner whose process exits 0 without stderr output.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::new(ProcessOutcome::exited(0))
    }

    /// Creates a runner that cannot start the process.
    #[must_use]
    pub fn failing_launch(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(ExecutionError::launch("pwsh", reason)),
            ..Self::succeeding()
        }
    }

    /// Lines the process prints on stdout.
    #[must_use]
    pub fn with_stdout<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stdout.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Every invocation run, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    /// Returns the number of processes started.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.invocations.lock().len()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        host: &dyn TaskHost,
    ) -> Result<ProcessOutcome, ExecutionError> {
        self.invocations.lock().push(invocation.clone());
        for line in &self.stdout {
            host.log(LogLevel::Command, line);
        }
        self.outcome.clone()
    }
}

/// A telemetry reporter that keeps every record.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl RecordingTelemetry {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record reported, in order.
    #[must_use]
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }
}

impl TelemetryReporter for RecordingTelemetry {
    fn report(&self, record: &TelemetryRecord) -> Result<(), TaskError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// A telemetry reporter that always fails.
#[derive(Debug, Clone, Default)]
pub struct FailingTelemetry;

impl TelemetryReporter for FailingTelemetry {
    fn report(&self, _record: &TelemetryRecord) -> Result<(), TaskError> {
        Err(TaskError::Telemetry("telemetry sink unavailable".to_string()))
    }
}
