//! HTTP download with optional parallel range requests.

use super::{ArtifactFetcher, FetchOptions};
use crate::errors::TaskError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Ranges smaller than this are not worth a separate request.
pub const DEFAULT_MIN_CHUNK_SIZE: u64 = 1024 * 1024;

/// Downloads artifacts over HTTP.
///
/// With a parallel limit above one, the fetcher probes the server with a
/// one-byte range request. Servers that honor it are read in up to
/// `parallel_limit` concurrent ranges, written to disk in order; anything
/// else is streamed in a single request.
#[derive(Debug, Clone)]
pub struct HttpArtifactFetcher {
    client: reqwest::Client,
    options: FetchOptions,
    min_chunk_size: u64,
}

impl HttpArtifactFetcher {
    /// Creates a fetcher sending `user_agent`.
    pub fn new(user_agent: &str, options: FetchOptions) -> Result<Self, TaskError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| TaskError::config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_client(client, options))
    }

    /// Creates a fetcher sharing an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, options: FetchOptions) -> Self {
        Self {
            client,
            options,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
        }
    }

    /// Sets the smallest range worth its own request.
    #[must_use]
    pub fn with_min_chunk_size(mut self, size: u64) -> Self {
        self.min_chunk_size = size.max(1);
        self
    }

    async fn download(&self, url: &str, part: &Path) -> Result<u64, TaskError> {
        let limit = self.options.concurrency();
        if limit <= 1 {
            let response = self.get(url, None).await?;
            return write_response(response, part).await;
        }

        let probe = self.get(url, Some((0, 0))).await?;
        if probe.status() != StatusCode::PARTIAL_CONTENT {
            // Range not honored: the probe already carries the whole body.
            return write_response(probe, part).await;
        }

        let Some(total) = content_range_total(&probe) else {
            drop(probe);
            let response = self.get(url, None).await?;
            return write_response(response, part).await;
        };
        drop(probe);

        let ranges = split_ranges(total, limit, self.min_chunk_size);
        if ranges.len() <= 1 {
            let response = self.get(url, None).await?;
            return write_response(response, part).await;
        }

        if self.options.verbose {
            tracing::info!(url, total, chunks = ranges.len(), limit, "Downloading in ranges");
        }

        let mut file = tokio::fs::File::create(part).await?;
        let mut chunks = stream::iter(ranges)
            .map(|range| self.fetch_range(url, range))
            .buffered(limit);

        let mut written = 0;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    async fn fetch_range(&self, url: &str, (start, end): (u64, u64)) -> Result<Vec<u8>, TaskError> {
        let response = self.get(url, Some((start, end))).await?;
        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(TaskError::transfer(format!(
                "range {start}-{end} of {url} answered with {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TaskError::transfer(format!("reading range {start}-{end} failed: {e}")))?;

        let expected = end - start + 1;
        if bytes.len() as u64 != expected {
            return Err(TaskError::transfer(format!(
                "range {start}-{end} returned {} bytes, expected {expected}",
                bytes.len()
            )));
        }
        if self.options.verbose {
            tracing::debug!(url, start, end, "Range downloaded");
        }
        Ok(bytes.to_vec())
    }

    async fn get(&self, url: &str, range: Option<(u64, u64)>) -> Result<reqwest::Response, TaskError> {
        let mut request = self.client.get(url);
        if let Some((start, end)) = range {
            request = request.header(RANGE, format!("bytes={start}-{end}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| TaskError::transfer(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TaskError::transfer(format!(
                "{url} responded with {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(&self, url: &str, target: &Path) -> Result<u64, TaskError> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TaskError::transfer(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let part = part_path(target);
        match self.download(url, &part).await {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::rename(&part, target).await {
                    let _ = tokio::fs::remove_file(&part).await;
                    return Err(TaskError::transfer(format!(
                        "cannot move download into {}: {e}",
                        target.display()
                    )));
                }
                tracing::debug!(url, target = %target.display(), bytes, "Downloaded release");
                Ok(bytes)
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&part).await;
                tracing::warn!(url, error = %err, "Failed to download release");
                Err(err)
            }
        }
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

async fn write_response(response: reqwest::Response, target: &Path) -> Result<u64, TaskError> {
    let mut file = tokio::fs::File::create(target).await?;
    let mut body = std::pin::pin!(response
        .bytes_stream()
        .map_err(|e| TaskError::transfer(format!("download interrupted: {e}"))));

    let mut written = 0;
    while let Some(chunk) = body.try_next().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Total size from a `Content-Range: bytes a-b/total` header.
fn content_range_total(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_RANGE)?
        .to_str()
        .ok()?
        .rsplit('/')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Splits `total` bytes into at most `limit` inclusive ranges of at least
/// `min_chunk` bytes each (the last may be shorter).
fn split_ranges(total: u64, limit: usize, min_chunk: u64) -> Vec<(u64, u64)> {
    if total == 0 {
        return Vec::new();
    }
    let by_size = total.div_ceil(min_chunk.max(1));
    let count = by_size.min(limit.max(1) as u64).max(1);
    let chunk = total.div_ceil(count);

    (0..count)
        .map(|i| i * chunk)
        .take_while(|start| *start < total)
        .map(|start| (start, (start + chunk).min(total) - 1))
        .collect()
}
