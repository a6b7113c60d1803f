//! Release settings shipped alongside the task (`config.json`).

use crate::errors::TaskError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Repository hosting the PowerDocu releases.
pub const DEFAULT_REPOSITORY: &str = "modery/PowerDocu";

/// Release API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Substring identifying the self-contained release asset.
pub const DEFAULT_ASSET_PATTERN: &str = "selfcontained";

/// Tag that selects the most recent release instead of a pinned one.
pub const LATEST_TAG: &str = "latest";

/// Which release to fetch and where from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReleaseSettings {
    /// `owner/name` of the repository.
    #[serde(rename = "gitHubRepository", alias = "GitHubRepository")]
    pub github_repository: String,
    /// Release tag to fetch, or `latest`.
    #[serde(rename = "powerDocuVersion", alias = "PowerDocuVersion")]
    pub powerdocu_version: String,
    /// Version of this task, used in the user agent and telemetry.
    pub version: String,
    /// Release API root.
    pub api_base_url: String,
    /// Substring the release asset name must contain.
    pub asset_pattern: String,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            github_repository: DEFAULT_REPOSITORY.to_string(),
            powerdocu_version: LATEST_TAG.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            asset_pattern: DEFAULT_ASSET_PATTERN.to_string(),
        }
    }
}

impl ReleaseSettings {
    /// Loads settings from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, TaskError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TaskError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Parses settings from JSON text.
    pub fn from_json(raw: &str) -> Result<Self, TaskError> {
        let settings: Self = serde_json::from_str(raw)
            .map_err(|e| TaskError::config(format!("invalid release settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the settings can address a release.
    pub fn validate(&self) -> Result<(), TaskError> {
        let mut parts = self.github_repository.split('/');
        let well_formed = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        );
        if !well_formed {
            return Err(TaskError::config(format!(
                "repository must be 'owner/name', got '{}'",
                self.github_repository
            )));
        }
        if self.powerdocu_version.trim().is_empty() {
            return Err(TaskError::config("release version must not be empty"));
        }
        if self.asset_pattern.is_empty() {
            return Err(TaskError::config("asset pattern must not be empty"));
        }
        Ok(())
    }

    /// Sets the release tag.
    #[must_use]
    pub fn with_version_tag(mut self, tag: impl Into<String>) -> Self {
        self.powerdocu_version = tag.into();
        self
    }

    /// Sets the API root.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// The user agent sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> String {
        format!("powerdocu-{}", self.version)
    }

    /// URL of the release lookup. Duplicate slashes are left for the
    /// resolver to normalize.
    #[must_use]
    pub fn release_url(&self) -> String {
        let tag = self.powerdocu_version.trim();
        if tag.eq_ignore_ascii_case(LATEST_TAG) {
            format!("{}/repos/{}/releases/latest", self.api_base_url, self.github_repository)
        } else {
            format!(
                "{}/repos/{}/releases/tags/{}",
                self.api_base_url, self.github_repository, tag
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = ReleaseSettings::default();
        assert_eq!(settings.github_repository, "modery/PowerDocu");
        assert_eq!(settings.asset_pattern, "selfcontained");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_legacy_json_keys() {
        let settings = ReleaseSettings::from_json(
            r#"{"GitHubRepository": "modery/PowerDocu", "PowerDocuVersion": "v1.2.3", "version": "0.4.0"}"#,
        )
        .unwrap();

        assert_eq!(settings.powerdocu_version, "v1.2.3");
        assert_eq!(settings.version, "0.4.0");
        assert_eq!(settings.user_agent(), "powerdocu-0.4.0");
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_release_url_for_tag_and_latest() {
        let pinned = ReleaseSettings::default().with_version_tag("v1.2.3");
        assert_eq!(
            pinned.release_url(),
            "https://api.github.com/repos/modery/PowerDocu/releases/tags/v1.2.3"
        );

        let latest = ReleaseSettings::default();
        assert_eq!(
            latest.release_url(),
            "https://api.github.com/repos/modery/PowerDocu/releases/latest"
        );
    }

    #[test]
    fn test_invalid_repository_rejected() {
        let err = ReleaseSettings::from_json(r#"{"gitHubRepository": "PowerDocu"}"#).unwrap_err();
        assert!(matches!(err, TaskError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ReleaseSettings::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
