//! Release lookup against the GitHub releases API.

use super::{GitHubRelease, ReleaseAsset, ReleaseResolver};
use crate::config::ReleaseSettings;
use crate::errors::TaskError;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

static DUPLICATE_SLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^:]/)/+").expect("duplicate slash pattern is valid"));

/// Collapses repeated slashes in a URL path, leaving `scheme://` intact.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    DUPLICATE_SLASHES.replace_all(url, "$1").into_owned()
}

/// Resolves a release through `GET /repos/{owner}/{name}/releases/...`.
#[derive(Debug, Clone)]
pub struct GitHubReleaseResolver {
    client: reqwest::Client,
    url: String,
    asset_pattern: String,
}

impl GitHubReleaseResolver {
    /// Creates a resolver for the configured release.
    pub fn new(settings: &ReleaseSettings) -> Result<Self, TaskError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent())
            .build()
            .map_err(|e| TaskError::config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self::with_client(client, settings))
    }

    /// Creates a resolver sharing an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, settings: &ReleaseSettings) -> Self {
        Self {
            client,
            url: normalize_url(&settings.release_url()),
            asset_pattern: settings.asset_pattern.clone(),
        }
    }

    /// The release lookup URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReleaseResolver for GitHubReleaseResolver {
    async fn resolve(&self) -> Result<ReleaseAsset, TaskError> {
        tracing::info!(url = %self.url, "Fetching release");

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| TaskError::resolution(format!("request to {} failed: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::resolution(format!(
                "{} responded with {status}",
                self.url
            )));
        }

        let release: GitHubRelease = response
            .json()
            .await
            .map_err(|e| TaskError::resolution(format!("malformed release response: {e}")))?;

        let asset = release.select_asset(&self.asset_pattern)?;
        tracing::info!(
            asset = %asset.filename,
            download_url = %asset.download_url,
            version = %asset.version,
            "Found release asset"
        );
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> ReleaseSettings {
        ReleaseSettings::default()
            .with_api_base_url(server.uri())
            .with_version_tag("v2.1.0")
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://api.github.com//repos/modery//PowerDocu/releases/tags/v1"),
            "https://api.github.com/repos/modery/PowerDocu/releases/tags/v1"
        );
        assert_eq!(normalize_url("https://example/a.zip"), "https://example/a.zip");
    }

    #[tokio::test]
    async fn test_resolves_selfcontained_asset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/modery/PowerDocu/releases/tags/v2.1.0"))
            .and(header("user-agent", ReleaseSettings::default().user_agent().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tag_name": "v2.1.0",
                "assets": [
                    {"name": "PowerDocu.zip", "browser_download_url": "https://example/p.zip"},
                    {"name": "PowerDocu-selfcontained.zip", "browser_download_url": "https://example/sc.zip"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = GitHubReleaseResolver::new(&settings(&server)).unwrap();
        let asset = resolver.resolve().await.unwrap();

        assert_eq!(
            asset,
            ReleaseAsset::new("https://example/sc.zip", "PowerDocu-selfcontained.zip", "v2.1.0")
        );
    }

    #[tokio::test]
    async fn test_http_error_is_resolution_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = GitHubReleaseResolver::new(&settings(&server)).unwrap();
        let err = resolver.resolve().await.unwrap_err();

        assert!(matches!(err, TaskError::Resolution(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_missing_asset_is_resolution_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tag_name": "v2.1.0",
                "assets": [{"name": "PowerDocu.zip", "browser_download_url": "https://example/p.zip"}]
            })))
            .mount(&server)
            .await;

        let resolver = GitHubReleaseResolver::new(&settings(&server)).unwrap();
        let err = resolver.resolve().await.unwrap_err();
        assert!(err.to_string().contains("selfcontained"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_resolution_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let resolver = GitHubReleaseResolver::new(&settings(&server)).unwrap();
        assert!(matches!(
            resolver.resolve().await,
            Err(TaskError::Resolution(_))
        ));
    }
}
