//! Streaming archive download.
//!
//! The body is written to `<destination>.part` and renamed into place only
//! after the transfer completes. `PartialArchive` removes the `.part` file
//! when dropped uncommitted, which covers errors and cancellation alike.

use std::path::{Path, PathBuf};

use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{Archive, ProgressCallback};
use crate::api::ApiError;
use crate::error::{RealmError, RealmResult};

/// `<destination>.part`
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "archive".into());
    name.push(".part");
    destination.with_file_name(name)
}

fn write_error(path: &Path, e: std::io::Error) -> RealmError {
    RealmError::Download(format!("failed to write {}: {}", path.display(), e))
}

/// An archive being written. Dropping it before `commit` deletes the file.
pub struct PartialArchive {
    part: PathBuf,
    destination: PathBuf,
    file: Option<File>,
    written: u64,
    committed: bool,
}

impl PartialArchive {
    pub async fn create(destination: &Path) -> RealmResult<Self> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_error(parent, e))?;
        }

        let part = part_path(destination);
        let file = File::create(&part).await.map_err(|e| write_error(&part, e))?;
        debug!(path = %part.display(), "Created partial archive");

        Ok(Self {
            part,
            destination: destination.to_path_buf(),
            file: Some(file),
            written: 0,
            committed: false,
        })
    }

    pub fn part_path(&self) -> &Path {
        &self.part
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> RealmResult<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| RealmError::Download("archive already closed".to_string()))?;
        file.write_all(chunk)
            .await
            .map_err(|e| write_error(&self.part, e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush, verify the length against `expected`, and move into place
    pub async fn commit(mut self, expected: Option<u64>) -> RealmResult<Archive> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(|e| write_error(&self.part, e))?;
            file.sync_all().await.map_err(|e| write_error(&self.part, e))?;
        }

        if let Some(expected) = expected {
            if self.written != expected {
                return Err(RealmError::Download(format!(
                    "transfer interrupted: received {} of {} bytes",
                    self.written, expected
                )));
            }
        }
        if self.written == 0 {
            return Err(RealmError::Download("server sent an empty archive".to_string()));
        }

        tokio::fs::rename(&self.part, &self.destination)
            .await
            .map_err(|e| write_error(&self.destination, e))?;
        self.committed = true;

        Ok(Archive {
            path: self.destination.clone(),
            bytes: self.written,
        })
    }
}

impl Drop for PartialArchive {
    fn drop(&mut self) {
        if !self.committed {
            drop(self.file.take());
            if std::fs::remove_file(&self.part).is_ok() {
                debug!(path = %self.part.display(), "Removed incomplete archive");
            }
        }
    }
}

/// Stream `url` into `destination`
pub async fn download_to(
    client: &Client,
    url: &str,
    destination: &Path,
    progress: Option<&ProgressCallback>,
) -> RealmResult<Archive> {
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ApiError::NetworkError(e.without_url()).into_download())?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_status(status, &body).into_download());
    }

    let total = response.content_length();
    info!(bytes = ?total, path = %destination.display(), "Downloading archive");

    let mut partial = PartialArchive::create(destination).await?;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ApiError::NetworkError(e.without_url()).into_download())?
    {
        partial.write_chunk(&chunk).await?;
        if let Some(cb) = progress {
            cb(partial.written(), total);
        }
    }

    partial.commit(total).await
}
