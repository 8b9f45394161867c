//! Local filesystem storage engine.
//!
//! All physical locations are `root / user_<id> / sanitize(key)`. Keys are
//! paths relative to the user's subtree and never leave it. Error messages
//! name keys, not absolute paths.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use hcloud_core::config::StorageConfig;
use hcloud_core::error::{AppError, ErrorKind};
use hcloud_core::result::AppResult;
use hcloud_core::types::{ByteStream, UserId};

use crate::listing::DirectoryStream;
use crate::path::{MAX_NAME_LEN, join_logical, sanitize, truncate_name, validate_name, validate_path};

/// Outcome of [`StorageEngine::create_directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedDirectory {
    /// Key of the directory.
    pub key: String,
    /// Whether this call created it rather than finding it in place.
    pub fresh: bool,
}

/// Maps `(user, key)` pairs onto the configured storage, mapping and
/// quarantine roots.
#[derive(Debug)]
pub struct StorageEngine {
    storage_root: PathBuf,
    mapped_root: PathBuf,
    pub(crate) recycle_root: PathBuf,
    last_stamp: AtomicU64,
}

impl StorageEngine {
    /// Create the engine and make sure all three roots exist.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        let engine = Self {
            storage_root: PathBuf::from(&config.storage_path),
            mapped_root: PathBuf::from(&config.mapped_path),
            recycle_root: PathBuf::from(&config.recycle_path),
            last_stamp: AtomicU64::new(0),
        };
        for (label, root) in [
            ("storage", &engine.storage_root),
            ("mapped", &engine.mapped_root),
            ("recycle", &engine.recycle_root),
        ] {
            fs::create_dir_all(root).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create {label} root"),
                    e,
                )
            })?;
        }
        info!(
            storage = %engine.storage_root.display(),
            mapped = %engine.mapped_root.display(),
            recycle = %engine.recycle_root.display(),
            "Storage engine ready"
        );
        Ok(engine)
    }

    /// Root of the storage area.
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// A user's subtree of the storage root.
    pub fn user_root(&self, user_id: UserId) -> PathBuf {
        user_dir(&self.storage_root, user_id)
    }

    /// Physical location of a key in the user's storage subtree.
    pub(crate) fn resolve(&self, user_id: UserId, key: &str) -> PathBuf {
        resolve_under(&self.storage_root, user_id, key)
    }

    /// Allocate a fresh physical key for `filename` inside `dir_key`.
    ///
    /// The stamp is strictly increasing within the process, so two saves of
    /// the same name never share a key. The name part is shortened so the
    /// final segment stays within [`MAX_NAME_LEN`].
    pub fn allocate_key(&self, dir_key: &str, filename: &str) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        let stamp = now.max(previous + 1).to_string();
        let name = truncate_name(filename, MAX_NAME_LEN - stamp.len() - 1);
        join_logical(&sanitize(dir_key), &format!("{stamp}_{name}"))
    }

    /// Stream an upload into the user's subtree and return its key.
    ///
    /// The file is created exclusively. Any stream, write or size mismatch
    /// error removes the partial file before returning, and dropping the
    /// future mid-copy removes it as well.
    pub async fn save_file(
        &self,
        user_id: UserId,
        dir_key: &str,
        filename: &str,
        size: u64,
        stream: ByteStream,
    ) -> AppResult<String> {
        validate_name(filename)?;
        if !dir_key.is_empty() {
            validate_path(dir_key)?;
        }

        let dir_key = sanitize(dir_key);
        let dir_path = self.resolve(user_id, &dir_key);
        fs::create_dir_all(&dir_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to prepare directory '{dir_key}'"),
                e,
            )
        })?;

        let key = self.allocate_key(&dir_key, filename);
        let full_path = self.resolve(user_id, &key);
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, format!("Failed to create '{key}'"), e)
            })?;

        let mut guard = PartialFile::new(full_path.clone());
        match copy_stream(file, stream, size).await {
            Ok(written) => {
                guard.keep();
                debug!(user_id = %user_id, key = %key, bytes = written, "Saved file");
                Ok(key)
            }
            Err(err) => {
                guard.keep();
                if let Err(cleanup) = fs::remove_file(&full_path).await {
                    warn!(key = %key, error = %cleanup, "Failed to remove partial upload");
                }
                Err(err)
            }
        }
    }

    /// Open a stored file for reading.
    pub async fn open_file(&self, user_id: UserId, key: &str) -> AppResult<fs::File> {
        let full_path = self.resolve(user_id, key);
        fs::File::open(&full_path)
            .await
            .map_err(|e| not_found_or_storage(e, key, "open"))
    }

    /// Open a stored file as a byte stream.
    pub async fn read_file(&self, user_id: UserId, key: &str) -> AppResult<ByteStream> {
        let file = self.open_file(user_id, key).await?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    /// Remove a stored file.
    pub async fn delete_file(&self, user_id: UserId, key: &str) -> AppResult<()> {
        let full_path = self.resolve(user_id, key);
        fs::remove_file(&full_path)
            .await
            .map_err(|e| not_found_or_storage(e, key, "delete"))?;
        debug!(user_id = %user_id, key = %key, "Deleted file");
        Ok(())
    }

    /// Whether a key exists in the user's storage subtree.
    pub async fn exists(&self, user_id: UserId, key: &str) -> AppResult<bool> {
        let full_path = self.resolve(user_id, key);
        fs::try_exists(&full_path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to stat '{key}'"), e)
        })
    }

    /// Create `parent/name` in the user's subtree. Existing directories are
    /// fine; the result says whether this call made it.
    pub async fn create_directory(
        &self,
        user_id: UserId,
        parent: &str,
        name: &str,
    ) -> AppResult<CreatedDirectory> {
        validate_name(name)?;
        if !parent.is_empty() {
            validate_path(parent)?;
        }
        let parent = sanitize(parent);
        let key = join_logical(&parent, name);
        fs::create_dir_all(self.resolve(user_id, &parent))
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to prepare directory '{parent}'"),
                    e,
                )
            })?;

        let fresh = match fs::create_dir(self.resolve(user_id, &key)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => false,
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create directory '{key}'"),
                    e,
                ));
            }
        };
        debug!(user_id = %user_id, key = %key, fresh, "Created directory");
        Ok(CreatedDirectory { key, fresh })
    }

    /// Remove an empty directory. Returns false if it was not empty or absent.
    pub async fn remove_dir_if_empty(&self, user_id: UserId, key: &str) -> AppResult<bool> {
        let full_path = self.resolve(user_id, key);
        match fs::remove_dir(&full_path).await {
            Ok(()) => Ok(true),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::DirectoryNotEmpty
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove directory '{key}'"),
                e,
            )),
        }
    }

    /// Link an existing external directory into the user's mapped tree.
    ///
    /// Returns the location of the created link.
    pub async fn map_directory(
        &self,
        user_id: UserId,
        source: &Path,
        target: &str,
    ) -> AppResult<PathBuf> {
        validate_path(target)?;
        let target = sanitize(target);
        if target.is_empty() {
            return Err(AppError::validation("Mapping target cannot be the user root"));
        }

        let meta = fs::metadata(source)
            .await
            .map_err(|e| not_found_or_storage(e, "mapping source", "inspect"))?;
        if !meta.is_dir() {
            return Err(AppError::validation("Mapping source is not a directory"));
        }
        let source = fs::canonicalize(source)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to resolve mapping source", e))?;

        let link = resolve_under(&self.mapped_root, user_id, &target);
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to prepare mapped tree", e)
            })?;
        }

        symlink_dir(&source, &link).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                AppError::conflict(format!("Mapping '{target}' already exists"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create mapping '{target}'"),
                    e,
                )
            }
        })?;

        info!(user_id = %user_id, target = %target, "Mapped external directory");
        Ok(link)
    }

    /// Remove a mapping link. The external directory is left untouched.
    pub async fn unlink_mapping(&self, user_id: UserId, target: &str) -> AppResult<()> {
        let link = resolve_under(&self.mapped_root, user_id, target);
        let meta = fs::symlink_metadata(&link)
            .await
            .map_err(|e| not_found_or_storage(e, target, "inspect"))?;
        if !meta.file_type().is_symlink() {
            return Err(AppError::storage(format!("Mapping '{target}' is not a link")));
        }
        remove_link(&link).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove mapping '{target}'"),
                e,
            )
        })?;
        info!(user_id = %user_id, target = %target, "Removed directory mapping");
        Ok(())
    }

    /// List one level of a directory in the user's storage subtree.
    pub async fn list_directory(&self, user_id: UserId, dir_key: &str) -> AppResult<DirectoryStream> {
        let key = sanitize(dir_key);
        DirectoryStream::open(self.resolve(user_id, &key), &key).await
    }

    /// List one level of a mapped directory.
    pub async fn list_mapping(&self, user_id: UserId, target: &str) -> AppResult<DirectoryStream> {
        let key = sanitize(target);
        DirectoryStream::open(resolve_under(&self.mapped_root, user_id, &key), &key).await
    }
}

pub(crate) fn user_dir(root: &Path, user_id: UserId) -> PathBuf {
    root.join(format!("user_{user_id}"))
}

pub(crate) fn resolve_under(root: &Path, user_id: UserId, key: &str) -> PathBuf {
    let mut path = user_dir(root, user_id);
    for segment in sanitize(key).split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

pub(crate) fn not_found_or_storage(err: std::io::Error, key: &str, action: &str) -> AppError {
    if err.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("'{key}' not found"))
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to {action} '{key}'"), err)
    }
}

async fn copy_stream(mut file: fs::File, mut stream: ByteStream, declared: u64) -> AppResult<u64> {
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| AppError::with_source(ErrorKind::Storage, "Upload stream failed", e))?;
        written += chunk.len() as u64;
        if written > declared {
            return Err(AppError::validation(format!(
                "Upload exceeds its declared size of {declared} bytes"
            )));
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to write chunk", e))?;
    }
    if written != declared {
        return Err(AppError::validation(format!(
            "Upload ended after {written} of {declared} declared bytes"
        )));
    }
    file.flush()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush file", e))?;
    file.sync_all()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to sync file", e))?;
    Ok(written)
}

/// Removes a half-written upload if the saving future is dropped.
struct PartialFile {
    path: Option<PathBuf>,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn keep(&mut self) {
        self.path = None;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(unix)]
async fn symlink_dir(source: &Path, link: &Path) -> std::io::Result<()> {
    fs::symlink(source, link).await
}

#[cfg(windows)]
async fn symlink_dir(source: &Path, link: &Path) -> std::io::Result<()> {
    fs::symlink_dir(source, link).await
}

#[cfg(unix)]
async fn remove_link(link: &Path) -> std::io::Result<()> {
    fs::remove_file(link).await
}

#[cfg(windows)]
async fn remove_link(link: &Path) -> std::io::Result<()> {
    fs::remove_dir(link).await
}
