//! Single-level directory listings.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use hcloud_core::error::{AppError, ErrorKind};
use hcloud_core::result::AppResult;

use crate::engine::not_found_or_storage;

/// One entry of a physical directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// File or directory name.
    pub name: String,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<DateTime<Utc>>,
    /// Whether the entry is a directory (links are followed).
    pub is_directory: bool,
}

/// A lazy, finite listing of one directory level.
///
/// Entries are produced in filesystem order as they are read. The stream
/// cannot be restarted; list again for a fresh view.
#[derive(Debug)]
pub struct DirectoryStream {
    key: String,
    inner: fs::ReadDir,
}

impl DirectoryStream {
    pub(crate) async fn open(path: PathBuf, key: &str) -> AppResult<Self> {
        let inner = fs::read_dir(&path)
            .await
            .map_err(|e| not_found_or_storage(e, display_key(key), "list"))?;
        Ok(Self {
            key: key.to_string(),
            inner,
        })
    }

    /// Read the next entry. Entries whose metadata cannot be read are skipped.
    pub async fn next_entry(&mut self) -> AppResult<Option<EntryInfo>> {
        loop {
            let Some(entry) = self.inner.next_entry().await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read entries of '{}'", display_key(&self.key)),
                    e,
                )
            })?
            else {
                return Ok(None);
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            // follows links so mapped directories report their target type
            let meta = match fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(e) => {
                    debug!(name = %name, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            return Ok(Some(EntryInfo {
                name,
                size: if meta.is_dir() { 0 } else { meta.len() },
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                is_directory: meta.is_dir(),
            }));
        }
    }

    /// Drain the listing into a vector.
    pub async fn collect_all(mut self) -> AppResult<Vec<EntryInfo>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry().await? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Adapt the listing into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = AppResult<EntryInfo>> + Send {
        futures::stream::unfold(Some(self), |state| async move {
            let mut listing = state?;
            match listing.next_entry().await {
                Ok(Some(entry)) => Some((Ok(entry), Some(listing))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }
}

fn display_key(key: &str) -> &str {
    if key.is_empty() { "/" } else { key }
}
