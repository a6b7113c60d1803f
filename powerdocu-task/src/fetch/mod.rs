//! Release download.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpArtifactFetcher, DEFAULT_MIN_CHUNK_SIZE};

use crate::config::AgentContext;
use crate::errors::TaskError;
use async_trait::async_trait;
use std::path::Path;

/// Downloads a URL to a file.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Stores the bytes behind `url` at `target`, returning the byte count.
    ///
    /// A failed fetch never leaves a partial file at `target`.
    async fn fetch(&self, url: &str, target: &Path) -> Result<u64, TaskError>;
}

/// Transfer tuning taken from the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchOptions {
    /// Maximum concurrent range requests; `None` downloads in one request.
    pub parallel_limit: Option<usize>,
    /// Log every transfer step.
    pub verbose: bool,
}

impl FetchOptions {
    /// Reads the parallel limit and debug flag from the agent.
    #[must_use]
    pub fn from_agent(agent: &AgentContext) -> Self {
        Self {
            parallel_limit: agent.parallel_limit(),
            verbose: agent.debug(),
        }
    }

    /// Sets the parallel limit.
    #[must_use]
    pub fn with_parallel_limit(mut self, limit: usize) -> Self {
        self.parallel_limit = Some(limit).filter(|l| *l > 0);
        self
    }

    /// Effective concurrency, at least one.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.parallel_limit.unwrap_or(1).max(1)
    }
}
