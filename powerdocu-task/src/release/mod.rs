//! Release lookup.
//!
//! A [`ReleaseResolver`] turns the configured repository and tag into the
//! one downloadable asset the task needs. The GitHub implementation lives in
//! [`github`] behind the `http` feature; selection logic is shared so it can
//! be tested without a network.

#[cfg(feature = "http")]
mod github;

#[cfg(feature = "http")]
pub use github::{normalize_url, GitHubReleaseResolver};

use crate::errors::TaskError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The asset selected for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// Direct download URL of the asset.
    pub download_url: String,
    /// Asset file name.
    pub filename: String,
    /// Tag of the release the asset belongs to.
    pub version: String,
}

impl ReleaseAsset {
    /// Creates a new release asset.
    #[must_use]
    pub fn new(
        download_url: impl Into<String>,
        filename: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            download_url: download_url.into(),
            filename: filename.into(),
            version: version.into(),
        }
    }
}

/// Looks up the release to run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    /// Resolves the configured release to a single asset.
    async fn resolve(&self) -> Result<ReleaseAsset, TaskError>;
}

/// A release as returned by the GitHub releases API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubRelease {
    /// The release tag.
    pub tag_name: String,
    /// Files attached to the release.
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

/// One file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubAsset {
    /// File name.
    pub name: String,
    /// Public download URL.
    pub browser_download_url: String,
}

impl GitHubRelease {
    /// Picks the first asset whose name contains `pattern`.
    pub fn select_asset(&self, pattern: &str) -> Result<ReleaseAsset, TaskError> {
        let asset = self
            .assets
            .iter()
            .find(|asset| asset.name.contains(pattern))
            .ok_or_else(|| {
                TaskError::resolution(format!(
                    "release {} has no asset matching '{pattern}'",
                    self.tag_name
                ))
            })?;

        Ok(ReleaseAsset::new(
            &asset.browser_download_url,
            &asset.name,
            &self.tag_name,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn release() -> GitHubRelease {
        serde_json::from_value(serde_json::json!({
            "tag_name": "v2.1.0",
            "name": "PowerDocu 2.1.0",
            "assets": [
                {"name": "PowerDocu.zip", "browser_download_url": "https://example/PowerDocu.zip", "size": 10},
                {"name": "PowerDocu-selfcontained.zip", "browser_download_url": "https://example/sc.zip", "size": 20},
                {"name": "PowerDocu-selfcontained-arm.zip", "browser_download_url": "https://example/arm.zip", "size": 20}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_select_first_matching_asset() {
        let asset = release().select_asset("selfcontained").unwrap();
        assert_eq!(
            asset,
            ReleaseAsset::new("https://example/sc.zip", "PowerDocu-selfcontained.zip", "v2.1.0")
        );
    }

    #[test]
    fn test_no_matching_asset_is_resolution_error() {
        let err = release().select_asset("portable").unwrap_err();
        assert!(matches!(err, TaskError::Resolution(_)));
        assert!(err.to_string().contains("v2.1.0"));
    }

    #[test]
    fn test_release_without_assets() {
        let release: GitHubRelease =
            serde_json::from_str(r#"{"tag_name": "v1.0.0"}"#).unwrap();
        assert!(release.select_asset("selfcontained").is_err());
    }
}
