//! Recycle bin: soft delete, restore, and purge of files and directories.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_core::types::{DirectoryId, FileId, RecycleItemId, UserId};
use hcloud_database::Repositories;
use hcloud_entity::directory::{CreateDirectory, Directory};
use hcloud_entity::file::{CreateFile, File};
use hcloud_entity::recycle::{CreateRecycleItem, RecycleItem, RecycleItemType};
use hcloud_storage::StorageEngine;
use hcloud_storage::classify::content_type_of;
use hcloud_storage::path::{join_logical, split_parent};

use super::naming::restored_name;
use crate::context::RequestContext;

/// Upper bound on `_restoredN` candidates tried before giving up.
const MAX_RESTORE_ATTEMPTS: u32 = 1000;

/// Outcome of a bulk purge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    /// Items selected for purging.
    pub scanned: usize,
    /// Recycle rows removed.
    pub purged: u64,
    /// Items whose quarantined content could not be removed.
    pub failures: Vec<PurgeFailure>,
}

/// One item whose physical removal failed during a bulk purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeFailure {
    /// The item.
    pub item_id: RecycleItemId,
    /// What went wrong.
    pub error: String,
}

/// An entry brought back from the recycle bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoredEntry {
    /// Logical path after restore (may carry a `_restoredN` suffix).
    pub path: String,
    /// The recreated record.
    pub entry: RestoredTarget,
}

/// The live record recreated by a restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum RestoredTarget {
    /// A restored file.
    File(File),
    /// A restored directory.
    Directory(Directory),
}

impl RestoredEntry {
    /// Logical name after restore.
    pub fn name(&self) -> &str {
        match &self.entry {
            RestoredTarget::File(file) => &file.name,
            RestoredTarget::Directory(dir) => &dir.name,
        }
    }

    /// Kind of entry that was restored.
    pub fn item_type(&self) -> RecycleItemType {
        match self.entry {
            RestoredTarget::File(_) => RecycleItemType::File,
            RestoredTarget::Directory(_) => RecycleItemType::Directory,
        }
    }
}

/// Manages the quarantine lifecycle of deleted entries.
#[derive(Debug, Clone)]
pub struct RecycleService {
    repos: Repositories,
    engine: Arc<StorageEngine>,
    retention: Duration,
}

impl RecycleService {
    /// Creates a new recycle service.
    pub fn new(repos: Repositories, engine: Arc<StorageEngine>, retention: Duration) -> Self {
        Self {
            repos,
            engine,
            retention,
        }
    }

    /// How long quarantined entries stay restorable.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Move a file into quarantine and drop its live metadata.
    pub async fn quarantine_file(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<RecycleItem> {
        let file = self
            .repos
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        ctx.ensure_owner(file.owner_id, "file")?;

        let dir_path = match file.directory_id {
            Some(dir_id) => self
                .repos
                .directories
                .find_by_id(dir_id)
                .await?
                .map(|d| d.path)
                .unwrap_or_default(),
            None => String::new(),
        };

        let item_id = RecycleItemId::new();
        let now = Utc::now();
        let record = CreateRecycleItem {
            id: item_id,
            owner_id: file.owner_id,
            original_name: file.name.clone(),
            original_path: join_logical(&dir_path, &file.name),
            restore_path: file.storage_path.clone(),
            quarantine_path: StorageEngine::quarantine_key(item_id),
            size_bytes: file.size_bytes,
            content_type: Some(file.content_type.clone()),
            item_type: RecycleItemType::File,
            deleted_at: now,
            expire_at: now + self.retention,
        };

        let files = self.repos.files.clone();
        let item = self
            .quarantine(record, || async move { files.delete(file_id).await })
            .await?;

        info!(
            user_id = %ctx.user_id,
            file_id = %file_id,
            item_id = %item.id,
            "File moved to recycle bin"
        );
        Ok(item)
    }

    /// Move an empty directory into quarantine and drop its live metadata.
    pub async fn quarantine_directory(
        &self,
        ctx: &RequestContext,
        dir_id: DirectoryId,
    ) -> AppResult<RecycleItem> {
        let dir = self
            .repos
            .directories
            .find_by_id(dir_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory {dir_id} not found")))?;
        ctx.ensure_owner(dir.owner_id, "directory")?;

        if dir.is_mapping {
            return Err(AppError::validation(
                "Mapped directories are unlinked, not recycled",
            ));
        }
        if self.repos.directories.count_entries(dir_id).await? > 0 {
            return Err(AppError::conflict(format!(
                "Directory '{}' is not empty",
                dir.path
            )));
        }

        let item_id = RecycleItemId::new();
        let now = Utc::now();
        let record = CreateRecycleItem {
            id: item_id,
            owner_id: dir.owner_id,
            original_name: dir.name.clone(),
            original_path: dir.path.clone(),
            restore_path: dir.storage_path.clone(),
            quarantine_path: StorageEngine::quarantine_key(item_id),
            size_bytes: 0,
            content_type: None,
            item_type: RecycleItemType::Directory,
            deleted_at: now,
            expire_at: now + self.retention,
        };

        let directories = self.repos.directories.clone();
        let item = self
            .quarantine(record, || async move { directories.delete(dir_id).await })
            .await?;

        info!(
            user_id = %ctx.user_id,
            directory_id = %dir_id,
            item_id = %item.id,
            "Directory moved to recycle bin"
        );
        Ok(item)
    }

    /// Shared move-record-delete sequence with compensation at every step.
    async fn quarantine<F, Fut>(&self, record: CreateRecycleItem, delete_live: F) -> AppResult<RecycleItem>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<bool>>,
    {
        let owner = record.owner_id;
        self.engine
            .move_to_quarantine(owner, &record.restore_path, &record.quarantine_path)
            .await?;

        let item = match self.repos.recycle.create(&record).await {
            Ok(item) => item,
            Err(err) => {
                self.undo_quarantine(owner, &record.quarantine_path, &record.restore_path)
                    .await;
                return Err(err);
            }
        };

        if let Err(err) = delete_live().await {
            if let Err(undo) = self.repos.recycle.delete(item.id).await {
                error!(item_id = %item.id, error = %undo, "Failed to drop recycle row during rollback");
            }
            self.undo_quarantine(owner, &record.quarantine_path, &record.restore_path)
                .await;
            return Err(err);
        }

        Ok(item)
    }

    async fn undo_quarantine(&self, owner: UserId, quarantine_key: &str, key: &str) {
        if let Err(err) = self.engine.move_from_quarantine(owner, quarantine_key, key).await {
            error!(
                user_id = %owner,
                quarantine_key = %quarantine_key,
                error = %err,
                "Failed to move content back after aborted delete"
            );
        }
    }

    /// Bring a quarantined entry back into the live namespace.
    ///
    /// Name collisions get a `_restoredN` suffix; nothing is overwritten. If
    /// the original parent directory is gone the entry lands at the user root.
    pub async fn restore(&self, ctx: &RequestContext, item_id: RecycleItemId) -> AppResult<RestoredEntry> {
        let item = self.find_owned(ctx, item_id).await?;

        let (parent_path, _) = split_parent(&item.original_path);
        let parent = if parent_path.is_empty() {
            None
        } else {
            let parent = self
                .repos
                .directories
                .find_by_path(item.owner_id, parent_path)
                .await?;
            if parent.is_none() {
                warn!(
                    item_id = %item.id,
                    parent = %parent_path,
                    "Original parent is gone; restoring at the user root"
                );
            }
            parent
        };

        let parent_path = parent.as_ref().map(|d| d.path.as_str()).unwrap_or("");
        let entry = match item.item_type {
            RecycleItemType::File => {
                RestoredTarget::File(self.restore_file(&item, parent.as_ref()).await?)
            }
            RecycleItemType::Directory => {
                RestoredTarget::Directory(self.restore_directory(&item, parent.as_ref()).await?)
            }
        };
        let path = match &entry {
            RestoredTarget::File(file) => join_logical(parent_path, &file.name),
            RestoredTarget::Directory(dir) => dir.path.clone(),
        };
        let restored = RestoredEntry { path, entry };

        if let Err(err) = self.repos.recycle.delete(item.id).await {
            warn!(item_id = %item.id, error = %err, "Restored entry but failed to drop its recycle row");
        }

        info!(
            user_id = %ctx.user_id,
            item_id = %item.id,
            name = %restored.name(),
            "Entry restored from recycle bin"
        );
        Ok(restored)
    }

    async fn restore_file(&self, item: &RecycleItem, parent: Option<&Directory>) -> AppResult<File> {
        let owner = item.owner_id;
        let directory_id = parent.map(|d| d.id);
        let dir_key = parent.map(|d| d.storage_path.as_str()).unwrap_or("");

        let mut name = None;
        for attempt in 0..MAX_RESTORE_ATTEMPTS {
            let candidate = restored_name(&item.original_name, attempt, true);
            let taken = self
                .repos
                .files
                .find_by_name(owner, directory_id, &candidate)
                .await?
                .is_some();
            if !taken {
                name = Some(candidate);
                break;
            }
        }
        let name = name.ok_or_else(|| {
            AppError::conflict(format!("No free name to restore '{}'", item.original_name))
        })?;

        let same_slot = split_parent(&item.restore_path).0 == dir_key && name == item.original_name;
        let dest_key = if same_slot && !self.engine.exists(owner, &item.restore_path).await? {
            item.restore_path.clone()
        } else {
            self.engine.allocate_key(dir_key, &name)
        };

        self.engine
            .move_from_quarantine(owner, &item.quarantine_path, &dest_key)
            .await?;

        let created = self
            .repos
            .files
            .create(&CreateFile {
                owner_id: owner,
                directory_id,
                name,
                storage_path: dest_key.clone(),
                size_bytes: item.size_bytes,
                content_type: item
                    .content_type
                    .clone()
                    .unwrap_or_else(|| content_type_of(&item.original_name)),
            })
            .await;

        match created {
            Ok(file) => Ok(file),
            Err(err) => {
                self.rollback_restore(owner, &dest_key, &item.quarantine_path).await;
                Err(err)
            }
        }
    }

    async fn restore_directory(
        &self,
        item: &RecycleItem,
        parent: Option<&Directory>,
    ) -> AppResult<Directory> {
        let owner = item.owner_id;
        let parent_path = parent.map(|d| d.path.as_str()).unwrap_or("");
        let parent_key = parent.map(|d| d.storage_path.as_str()).unwrap_or("");
        let same_parent = split_parent(&item.restore_path).0 == parent_key;

        let mut chosen = None;
        for attempt in 0..MAX_RESTORE_ATTEMPTS {
            let candidate = restored_name(&item.original_name, attempt, false);
            let path = join_logical(parent_path, &candidate);
            let key = if attempt == 0 && same_parent {
                item.restore_path.clone()
            } else if attempt == 0 {
                join_logical(parent_key, &candidate)
            } else {
                self.engine.allocate_key(parent_key, &candidate)
            };
            let logical_taken = self
                .repos
                .directories
                .find_by_path(owner, &path)
                .await?
                .is_some();
            if !logical_taken && !self.engine.exists(owner, &key).await? {
                chosen = Some((candidate, path, key));
                break;
            }
        }
        let (name, path, key) = chosen.ok_or_else(|| {
            AppError::conflict(format!("No free name to restore '{}'", item.original_name))
        })?;

        self.engine
            .move_from_quarantine(owner, &item.quarantine_path, &key)
            .await?;

        let created = self
            .repos
            .directories
            .create(&CreateDirectory {
                owner_id: owner,
                parent_id: parent.map(|d| d.id),
                name,
                path,
                storage_path: key.clone(),
                is_mapping: false,
                mapping_target: None,
            })
            .await;

        match created {
            Ok(dir) => Ok(dir),
            Err(err) => {
                self.rollback_restore(owner, &key, &item.quarantine_path).await;
                Err(err)
            }
        }
    }

    async fn rollback_restore(&self, owner: UserId, key: &str, quarantine_key: &str) {
        if let Err(err) = self.engine.move_to_quarantine(owner, key, quarantine_key).await {
            error!(
                user_id = %owner,
                key = %key,
                error = %err,
                "Failed to return content to quarantine after aborted restore"
            );
        }
    }

    /// Permanently delete one quarantined entry.
    pub async fn purge_one(&self, ctx: &RequestContext, item_id: RecycleItemId) -> AppResult<()> {
        let item = self.find_owned(ctx, item_id).await?;
        self.engine
            .purge_quarantined(item.owner_id, &item.quarantine_path)
            .await?;
        self.repos.recycle.delete(item.id).await?;
        info!(user_id = %ctx.user_id, item_id = %item.id, "Recycle item purged");
        Ok(())
    }

    /// Purge every item whose retention has run out.
    pub async fn purge_expired(&self) -> AppResult<PurgeReport> {
        self.purge_expired_at(Utc::now()).await
    }

    /// Purge every item with `expire_at <= now`.
    ///
    /// Physical failures are reported and do not stop the sweep; the rows of
    /// all scanned items are removed.
    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> AppResult<PurgeReport> {
        let items = self.repos.recycle.list_expired(now).await?;
        let report = self.purge_items(items).await?;
        info!(
            scanned = report.scanned,
            purged = report.purged,
            failures = report.failures.len(),
            "Expired recycle items purged"
        );
        Ok(report)
    }

    /// Purge everything in the caller's recycle bin.
    pub async fn empty_all(&self, ctx: &RequestContext) -> AppResult<PurgeReport> {
        let items = self.repos.recycle.list_by_owner(ctx.user_id).await?;
        let report = self.purge_items(items).await?;
        info!(
            user_id = %ctx.user_id,
            purged = report.purged,
            failures = report.failures.len(),
            "Recycle bin emptied"
        );
        Ok(report)
    }

    async fn purge_items(&self, items: Vec<RecycleItem>) -> AppResult<PurgeReport> {
        let mut report = PurgeReport {
            scanned: items.len(),
            ..PurgeReport::default()
        };
        for item in &items {
            if let Err(err) = self
                .engine
                .purge_quarantined(item.owner_id, &item.quarantine_path)
                .await
            {
                warn!(item_id = %item.id, error = %err, "Failed to remove quarantined content");
                report.failures.push(PurgeFailure {
                    item_id: item.id,
                    error: err.to_string(),
                });
            }
        }
        let ids: Vec<RecycleItemId> = items.iter().map(|item| item.id).collect();
        report.purged = self.repos.recycle.delete_many(&ids).await?;
        Ok(report)
    }

    /// The caller's quarantined entries, most recently deleted first.
    pub async fn list_quarantined(&self, ctx: &RequestContext) -> AppResult<Vec<RecycleItem>> {
        self.repos.recycle.list_by_owner(ctx.user_id).await
    }

    async fn find_owned(&self, ctx: &RequestContext, item_id: RecycleItemId) -> AppResult<RecycleItem> {
        let item = self
            .repos
            .recycle
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Recycle item {item_id} not found")))?;
        ctx.ensure_owner(item.owner_id, "recycle item")?;
        Ok(item)
    }
}
