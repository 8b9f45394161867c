//! Core file operations.

use std::sync::Arc;

use tokio::fs;
use tracing::{info, warn};

use hcloud_core::error::{AppError, ErrorKind};
use hcloud_core::result::AppResult;
use hcloud_core::types::FileId;
use hcloud_database::Repositories;
use hcloud_entity::file::File;
use hcloud_entity::recycle::RecycleItem;
use hcloud_storage::path::validate_name;
use hcloud_storage::{StorageEngine, StorageInfo, classify};

use crate::context::RequestContext;
use crate::recycle::RecycleService;

/// Handles file operations for the owner of each file.
#[derive(Debug, Clone)]
pub struct FileService {
    pub(super) repos: Repositories,
    pub(super) engine: Arc<StorageEngine>,
    recycle: Arc<RecycleService>,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(repos: Repositories, engine: Arc<StorageEngine>, recycle: Arc<RecycleService>) -> Self {
        Self {
            repos,
            engine,
            recycle,
        }
    }

    /// Gets a file record owned by the caller.
    pub async fn get_file(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<File> {
        let file = self
            .repos
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        ctx.ensure_owner(file.owner_id, "file")?;
        Ok(file)
    }

    /// Opens a file for reading.
    pub async fn open(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<(File, fs::File)> {
        let file = self.get_file(ctx, file_id).await?;
        let handle = self.engine.open_file(file.owner_id, &file.storage_path).await?;
        Ok((file, handle))
    }

    /// Renames a file. The stored content does not move.
    pub async fn rename_file(&self, ctx: &RequestContext, file_id: FileId, new_name: &str) -> AppResult<File> {
        validate_name(new_name)?;
        let file = self.get_file(ctx, file_id).await?;
        if file.name == new_name {
            return Ok(file);
        }
        classify(new_name, file.size_bytes.max(0) as u64)?;

        if self
            .repos
            .files
            .find_by_name(file.owner_id, file.directory_id, new_name)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!("File '{new_name}' already exists")));
        }

        let renamed = self.repos.files.rename(file_id, new_name).await?;
        info!(
            user_id = %ctx.user_id,
            file_id = %file_id,
            from = %file.name,
            to = %new_name,
            "File renamed"
        );
        Ok(renamed)
    }

    /// Moves a file to the recycle bin.
    pub async fn delete_file(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<RecycleItem> {
        self.recycle.quarantine_file(ctx, file_id).await
    }

    /// Removes a file and its content immediately. Administrators only.
    pub async fn force_delete(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<()> {
        if !ctx.is_admin {
            return Err(AppError::forbidden("Only administrators can force-delete files"));
        }
        let file = self
            .repos
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;

        match self.engine.delete_file(file.owner_id, &file.storage_path).await {
            Ok(()) => {}
            Err(err) if err.is(ErrorKind::NotFound) => {
                warn!(file_id = %file_id, "File content already gone");
            }
            Err(err) => return Err(err),
        }
        self.repos.files.delete(file_id).await?;

        info!(
            admin_id = %ctx.user_id,
            owner_id = %file.owner_id,
            file_id = %file_id,
            "File force-deleted"
        );
        Ok(())
    }

    /// Capacity of the volume holding user content.
    pub async fn storage_stats(&self) -> AppResult<StorageInfo> {
        self.engine.system_storage_info().await
    }
}
