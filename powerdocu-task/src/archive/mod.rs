//! Archive extraction.
//!
//! Extraction is blocking work, so it runs on tokio's blocking pool and
//! completes with exactly one `Result`.

use crate::errors::TaskError;
use async_trait::async_trait;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Unpacks a downloaded archive.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extracts `archive` into `destination`, returning the number of files
    /// written.
    async fn extract(&self, archive: &Path, destination: &Path) -> Result<usize, TaskError>;
}

/// Extracts zip archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveExtractor;

impl ZipArchiveExtractor {
    /// Creates a new zip extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArchiveExtractor for ZipArchiveExtractor {
    async fn extract(&self, archive: &Path, destination: &Path) -> Result<usize, TaskError> {
        tracing::debug!(archive = %archive.display(), "Extracting");

        let archive_path = archive.to_path_buf();
        let destination_path = destination.to_path_buf();
        let result = tokio::task::spawn_blocking(move || extract_zip(&archive_path, &destination_path))
            .await
            .map_err(|e| TaskError::extraction(format!("extraction task aborted: {e}")))?;

        match &result {
            Ok(files) => {
                tracing::debug!(destination = %destination.display(), files, "Extracted");
            }
            Err(err) => {
                tracing::warn!(archive = %archive.display(), error = %err, "Failed to extract");
            }
        }
        result
    }
}

fn extract_zip(archive: &Path, destination: &Path) -> Result<usize, TaskError> {
    let file = File::open(archive)
        .map_err(|e| TaskError::extraction(format!("cannot open {}: {e}", archive.display())))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| TaskError::extraction(format!("{} is not a valid zip: {e}", archive.display())))?;

    let io_error = |path: &Path, e: io::Error| TaskError::extraction(format!("{}: {e}", path.display()));

    std::fs::create_dir_all(destination).map_err(|e| io_error(destination, e))?;

    let mut files = 0;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| TaskError::extraction(format!("entry {index}: {e}")))?;

        let relative: PathBuf = entry.enclosed_name().map(Path::to_path_buf).ok_or_else(|| {
            TaskError::extraction(format!(
                "entry '{}' escapes the destination directory",
                entry.name()
            ))
        })?;
        let out_path = destination.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| io_error(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let mut out = File::create(&out_path).map_err(|e| io_error(&out_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| io_error(&out_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
                .map_err(|e| io_error(&out_path, e))?;
        }

        files += 1;
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, contents) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn test_extracts_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("PowerDocu.zip");
        write_zip(
            &archive,
            &[
                ("PowerDocu.CLI.exe", b"binary"),
                ("Resources/template.docx", b"docx"),
            ],
        );

        let out = dir.path().join("out");
        let files = ZipArchiveExtractor::new().extract(&archive, &out).await.unwrap();

        assert_eq!(files, 2);
        assert_eq!(std::fs::read(out.join("PowerDocu.CLI.exe")).unwrap(), b"binary");
        assert_eq!(
            std::fs::read(out.join("Resources").join("template.docx")).unwrap(),
            b"docx"
        );
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"not a zip at all").unwrap();

        let err = ZipArchiveExtractor::new()
            .extract(&archive, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_missing_archive_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ZipArchiveExtractor::new()
            .extract(&dir.path().join("absent.zip"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("../escaped.txt", b"x")]);

        let out = dir.path().join("out");
        let err = ZipArchiveExtractor::new().extract(&archive, &out).await.unwrap_err();

        assert!(err.to_string().contains("escapes"));
        assert!(!dir.path().join("escaped.txt").exists());
    }
}
