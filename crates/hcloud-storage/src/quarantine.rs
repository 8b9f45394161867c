//! Physical moves between a user's storage subtree and the quarantine root.
//!
//! Quarantine keys are bare item ids directly under the user's quarantine
//! directory; the original name lives in the recycle row. Moves never
//! overwrite an existing destination.

use std::io;
use std::path::Path;

use tokio::fs;
use tracing::{debug, warn};

use hcloud_core::error::{AppError, ErrorKind};
use hcloud_core::result::AppResult;
use hcloud_core::types::{RecycleItemId, UserId};

use crate::engine::{StorageEngine, not_found_or_storage, resolve_under};

impl StorageEngine {
    /// Quarantine key for an item.
    pub fn quarantine_key(item_id: RecycleItemId) -> String {
        item_id.to_string()
    }

    /// Move `key` out of the user's storage subtree into quarantine.
    pub async fn move_to_quarantine(
        &self,
        user_id: UserId,
        key: &str,
        quarantine_key: &str,
    ) -> AppResult<()> {
        let from = self.resolve(user_id, key);
        let to = resolve_under(&self.recycle_root, user_id, quarantine_key);
        move_entry(&from, &to, key).await?;
        debug!(user_id = %user_id, key = %key, quarantine_key = %quarantine_key, "Quarantined entry");
        Ok(())
    }

    /// Move quarantined content back to `dest_key` in the storage subtree.
    pub async fn move_from_quarantine(
        &self,
        user_id: UserId,
        quarantine_key: &str,
        dest_key: &str,
    ) -> AppResult<()> {
        let from = resolve_under(&self.recycle_root, user_id, quarantine_key);
        let to = self.resolve(user_id, dest_key);
        move_entry(&from, &to, quarantine_key).await?;
        debug!(user_id = %user_id, quarantine_key = %quarantine_key, key = %dest_key, "Restored entry");
        Ok(())
    }

    /// Whether quarantined content is still present.
    pub async fn quarantine_exists(&self, user_id: UserId, quarantine_key: &str) -> AppResult<bool> {
        let path = resolve_under(&self.recycle_root, user_id, quarantine_key);
        fs::try_exists(&path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to stat quarantined '{quarantine_key}'"),
                e,
            )
        })
    }

    /// Permanently remove quarantined content. Missing content is not an error.
    pub async fn purge_quarantined(&self, user_id: UserId, quarantine_key: &str) -> AppResult<()> {
        let path = resolve_under(&self.recycle_root, user_id, quarantine_key);
        let meta = match fs::symlink_metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(user_id = %user_id, quarantine_key = %quarantine_key, "Quarantined content already gone");
                return Ok(());
            }
            Err(e) => return Err(not_found_or_storage(e, quarantine_key, "inspect")),
        };
        let result = if meta.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        result.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to purge '{quarantine_key}'"),
                e,
            )
        })
    }
}

async fn move_entry(from: &Path, to: &Path, key: &str) -> AppResult<()> {
    let meta = fs::symlink_metadata(from)
        .await
        .map_err(|e| not_found_or_storage(e, key, "move"))?;
    if fs::try_exists(to).await.unwrap_or(false) {
        return Err(AppError::conflict(format!(
            "Destination for '{key}' already exists"
        )));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to prepare destination", e)
        })?;
    }

    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_across_devices(from, to, meta.is_dir())
                .await
                .map_err(|e| AppError::with_source(ErrorKind::Storage, format!("Failed to move '{key}'"), e))
        }
        Err(e) => Err(AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to move '{key}'"),
            e,
        )),
    }
}

/// Fallback when the roots live on different volumes. Directories reach
/// quarantine only when empty, so recreating them is enough.
async fn copy_across_devices(from: &Path, to: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        fs::create_dir(to).await?;
        fs::remove_dir(from).await
    } else {
        fs::copy(from, to).await?;
        if let Err(e) = fs::remove_file(from).await {
            let _ = fs::remove_file(to).await;
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcloud_core::ErrorKind;
    use hcloud_core::config::StorageConfig;

    async fn engine(dir: &tempfile::TempDir) -> StorageEngine {
        StorageEngine::new(&StorageConfig::under(dir.path()))
            .await
            .expect("engine")
    }

    #[tokio::test]
    async fn test_quarantine_and_restore_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = engine(&dir).await;
        let user = UserId::new();
        let root = engine.user_root(user);
        std::fs::create_dir_all(root.join("docs")).expect("docs");
        std::fs::write(root.join("docs/1_a.txt"), b"abc").expect("seed");

        let qkey = StorageEngine::quarantine_key(RecycleItemId::new());
        engine
            .move_to_quarantine(user, "docs/1_a.txt", &qkey)
            .await
            .expect("quarantine");
        assert!(!root.join("docs/1_a.txt").exists());
        assert!(engine.quarantine_exists(user, &qkey).await.expect("exists"));

        engine
            .move_from_quarantine(user, &qkey, "docs/1_a.txt")
            .await
            .expect("restore");
        assert_eq!(std::fs::read(root.join("docs/1_a.txt")).expect("read"), b"abc");
        assert!(!engine.quarantine_exists(user, &qkey).await.expect("exists"));
    }

    #[tokio::test]
    async fn test_restore_never_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = engine(&dir).await;
        let user = UserId::new();
        let root = engine.user_root(user);
        std::fs::create_dir_all(&root).expect("root");
        std::fs::write(root.join("a.txt"), b"old").expect("seed");

        let qkey = StorageEngine::quarantine_key(RecycleItemId::new());
        engine.move_to_quarantine(user, "a.txt", &qkey).await.expect("quarantine");
        std::fs::write(root.join("a.txt"), b"new").expect("replacement");

        let err = engine
            .move_from_quarantine(user, &qkey, "a.txt")
            .await
            .expect_err("collision");
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(std::fs::read(root.join("a.txt")).expect("read"), b"new");
    }

    #[tokio::test]
    async fn test_purge_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = engine(&dir).await;
        let user = UserId::new();
        std::fs::create_dir_all(engine.user_root(user).join("empty")).expect("dir");

        let qkey = StorageEngine::quarantine_key(RecycleItemId::new());
        engine.move_to_quarantine(user, "empty", &qkey).await.expect("quarantine");
        engine.purge_quarantined(user, &qkey).await.expect("purge");
        assert!(!engine.quarantine_exists(user, &qkey).await.expect("exists"));
        engine.purge_quarantined(user, &qkey).await.expect("purge again");
    }

    #[tokio::test]
    async fn test_longest_names_fit_in_quarantine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = engine(&dir).await;
        let user = UserId::new();
        let root = engine.user_root(user);
        let name = "q".repeat(crate::path::MAX_NAME_LEN);
        std::fs::create_dir_all(root.join(&name)).expect("dir");

        let qkey = StorageEngine::quarantine_key(RecycleItemId::new());
        engine.move_to_quarantine(user, &name, &qkey).await.expect("quarantine");
        engine.move_from_quarantine(user, &qkey, &name).await.expect("restore");
        assert!(root.join(&name).is_dir());
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = engine(&dir).await;
        let err = engine
            .move_to_quarantine(UserId::new(), "nope", "x_nope")
            .await
            .expect_err("missing");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
