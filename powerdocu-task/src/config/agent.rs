//! Build agent environment.
//!
//! The agent exposes pipeline variables as environment variables, with dots
//! replaced by underscores and names upper-cased (`Agent.TempDirectory` is
//! `AGENT_TEMPDIRECTORY`). [`AgentContext`] snapshots them once so nothing
//! downstream reads the process environment.

use std::collections::BTreeMap;
use std::path::PathBuf;

const TEMP_DIRECTORY: &str = "Agent.TempDirectory";
const SYSTEM_DEBUG: &str = "System.Debug";
const PARALLEL_LIMIT: &str = "release.artifact.download.parallellimit";
const AGENT_VERSION: &str = "Agent.Version";

/// Converts a pipeline variable name to its environment variable name.
#[must_use]
pub fn variable_env_name(name: &str) -> String {
    name.replace('.', "_").to_uppercase()
}

/// Snapshot of the agent's pipeline variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentContext {
    variables: BTreeMap<String, String>,
}

impl AgentContext {
    /// Captures the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Builds a context from `(ENV_NAME, value)` pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let variables = vars
            .into_iter()
            .map(|(k, v)| (k.into().to_uppercase(), v.into()))
            .collect();
        Self { variables }
    }

    /// Sets a pipeline variable.
    #[must_use]
    pub fn with_variable(mut self, name: &str, value: impl Into<String>) -> Self {
        self.variables.insert(variable_env_name(name), value.into());
        self
    }

    /// Looks up a pipeline variable by its pipeline name (`System.Debug`).
    /// Empty values count as unset.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables
            .get(&variable_env_name(name))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Directory the release is downloaded to and run from.
    #[must_use]
    pub fn temp_directory(&self) -> PathBuf {
        self.variable(TEMP_DIRECTORY)
            .map_or_else(std::env::temp_dir, PathBuf::from)
    }

    /// Whether the pipeline runs with debugging enabled.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.variable(SYSTEM_DEBUG)
            .is_some_and(|v| !v.eq_ignore_ascii_case("false"))
    }

    /// Maximum concurrent transfers for the download, if configured.
    #[must_use]
    pub fn parallel_limit(&self) -> Option<usize> {
        self.variable(PARALLEL_LIMIT)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
    }

    /// Raw agent version string.
    #[must_use]
    pub fn agent_version(&self) -> Option<&str> {
        self.variable(AGENT_VERSION)
    }

    /// `(major, minor)` of the agent version; unparsable parts read as zero.
    #[must_use]
    pub fn agent_version_parts(&self) -> (u32, u32) {
        let mut parts = self.agent_version().unwrap_or_default().split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };
        let major = next();
        let minor = next();
        (major, minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_env_name() {
        assert_eq!(variable_env_name("Agent.TempDirectory"), "AGENT_TEMPDIRECTORY");
        assert_eq!(
            variable_env_name("release.artifact.download.parallellimit"),
            "RELEASE_ARTIFACT_DOWNLOAD_PARALLELLIMIT"
        );
    }

    #[test]
    fn test_temp_directory_from_agent() {
        let ctx = AgentContext::from_vars([("AGENT_TEMPDIRECTORY", "/agent/_temp")]);
        assert_eq!(ctx.temp_directory(), PathBuf::from("/agent/_temp"));
    }

    #[test]
    fn test_temp_directory_falls_back_to_os() {
        let ctx = AgentContext::default();
        assert_eq!(ctx.temp_directory(), std::env::temp_dir());
    }

    #[test]
    fn test_debug_flag() {
        assert!(!AgentContext::default().debug());
        assert!(AgentContext::default().with_variable("System.Debug", "true").debug());
        assert!(!AgentContext::default().with_variable("System.Debug", "False").debug());
    }

    #[test]
    fn test_parallel_limit() {
        let ctx = AgentContext::from_vars([("release_artifact_download_parallellimit", "8")]);
        assert_eq!(ctx.parallel_limit(), Some(8));

        let zero = AgentContext::default().with_variable(PARALLEL_LIMIT, "0");
        assert_eq!(zero.parallel_limit(), None);

        let junk = AgentContext::default().with_variable(PARALLEL_LIMIT, "many");
        assert_eq!(junk.parallel_limit(), None);
    }

    #[test]
    fn test_agent_version_parts() {
        let ctx = AgentContext::default().with_variable("Agent.Version", "2.120.1");
        assert_eq!(ctx.agent_version_parts(), (2, 120));

        assert_eq!(AgentContext::default().agent_version_parts(), (0, 0));
    }
}
