//! Directory CRUD, external mappings, and reconciled listings.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hcloud_core::error::{AppError, ErrorKind};
use hcloud_core::result::AppResult;
use hcloud_core::types::{DirectoryId, UserId};
use hcloud_database::Repositories;
use hcloud_entity::directory::{CreateDirectory, Directory};
use hcloud_entity::file::File;
use hcloud_entity::recycle::RecycleItem;
use hcloud_storage::path::{join_logical, sanitize, split_parent, validate_name, validate_path};
use hcloud_storage::{CreatedDirectory, EntryInfo, StorageEngine};

use crate::context::RequestContext;
use crate::recycle::RecycleService;

/// One level of a user's namespace, reconciled against the disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// The listed directory, `None` at the user root.
    pub directory: Option<Directory>,
    /// Child directories.
    pub directories: Vec<Directory>,
    /// Files whose content is present.
    pub files: Vec<File>,
    /// Physical entries with no metadata row. Left in place.
    pub unindexed: Vec<EntryInfo>,
    /// File rows dropped because their content was missing.
    pub stale_removed: Vec<File>,
}

/// Manages directories in users' namespaces.
#[derive(Debug, Clone)]
pub struct DirectoryService {
    repos: Repositories,
    engine: Arc<StorageEngine>,
    recycle: Arc<RecycleService>,
}

impl DirectoryService {
    /// Creates a new directory service.
    pub fn new(repos: Repositories, engine: Arc<StorageEngine>, recycle: Arc<RecycleService>) -> Self {
        Self {
            repos,
            engine,
            recycle,
        }
    }

    /// Creates `name` under `parent_path`.
    ///
    /// Exactly one of several concurrent calls for the same path succeeds;
    /// the others fail with `Conflict`.
    pub async fn create_directory(
        &self,
        ctx: &RequestContext,
        parent_path: &str,
        name: &str,
    ) -> AppResult<Directory> {
        validate_name(name)?;
        let parent_path = normalize_dir_path(parent_path)?;
        let path = join_logical(&parent_path, name);

        if self
            .repos
            .directories
            .find_by_path(ctx.user_id, &path)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!("Directory '{path}' already exists")));
        }

        let parent = self.writable_parent(ctx.user_id, &parent_path).await?;
        let parent_key = parent.as_ref().map(|d| d.storage_path.as_str()).unwrap_or("");

        // a renamed sibling or a concurrent create may hold the plain key;
        // each call then takes a stamped key of its own
        let mut created = self.engine.create_directory(ctx.user_id, parent_key, name).await?;
        if !created.fresh {
            let stamped = self.engine.allocate_key(parent_key, name);
            created = self
                .engine
                .create_directory(ctx.user_id, parent_key, split_parent(&stamped).1)
                .await?;
        }
        let CreatedDirectory { key, fresh } = created;

        let inserted = self
            .repos
            .directories
            .create(&CreateDirectory {
                owner_id: ctx.user_id,
                parent_id: parent.as_ref().map(|d| d.id),
                name: name.to_string(),
                path: path.clone(),
                storage_path: key.clone(),
                is_mapping: false,
                mapping_target: None,
            })
            .await;

        match inserted {
            Ok(dir) => {
                info!(user_id = %ctx.user_id, directory_id = %dir.id, path = %path, "Directory created");
                Ok(dir)
            }
            Err(err) => {
                if fresh {
                    if let Err(cleanup) = self.engine.remove_dir_if_empty(ctx.user_id, &key).await {
                        warn!(key = %key, error = %cleanup, "Failed to remove directory after aborted create");
                    }
                }
                Err(err)
            }
        }
    }

    /// Links an external directory into the caller's namespace at `target_path`.
    pub async fn map_directory(
        &self,
        ctx: &RequestContext,
        source: &Path,
        target_path: &str,
    ) -> AppResult<Directory> {
        validate_path(target_path)?;
        let target = sanitize(target_path);
        let (parent_path, name) = split_parent(&target);
        validate_name(name)?;

        if self
            .repos
            .directories
            .find_by_path(ctx.user_id, &target)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!("Directory '{target}' already exists")));
        }
        let parent = self.writable_parent(ctx.user_id, parent_path).await?;

        self.engine.map_directory(ctx.user_id, source, &target).await?;

        let created = self
            .repos
            .directories
            .create(&CreateDirectory {
                owner_id: ctx.user_id,
                parent_id: parent.as_ref().map(|d| d.id),
                name: name.to_string(),
                path: target.clone(),
                storage_path: target.clone(),
                is_mapping: true,
                mapping_target: Some(source.to_string_lossy().into_owned()),
            })
            .await;

        match created {
            Ok(dir) => {
                info!(user_id = %ctx.user_id, directory_id = %dir.id, path = %target, "Directory mapped");
                Ok(dir)
            }
            Err(err) => {
                if let Err(cleanup) = self.engine.unlink_mapping(ctx.user_id, &target).await {
                    warn!(target = %target, error = %cleanup, "Failed to remove link after aborted mapping");
                }
                Err(err)
            }
        }
    }

    /// Lists one level of the caller's namespace.
    ///
    /// File rows whose content is gone are deleted. Physical entries with no
    /// row are reported as unindexed and left alone. Mapped directories list
    /// their external contents, all unindexed.
    pub async fn list_directory(&self, ctx: &RequestContext, path: &str) -> AppResult<DirectoryListing> {
        let path = normalize_dir_path(path)?;
        let directory = if path.is_empty() {
            None
        } else {
            Some(
                self.repos
                    .directories
                    .find_by_path(ctx.user_id, &path)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Directory '{path}' not found")))?,
            )
        };

        if let Some(dir) = directory.as_ref().filter(|d| d.is_mapping) {
            let unindexed = self
                .engine
                .list_mapping(ctx.user_id, &dir.storage_path)
                .await?
                .collect_all()
                .await?;
            return Ok(DirectoryListing {
                directory,
                unindexed,
                ..DirectoryListing::default()
            });
        }

        let dir_id = directory.as_ref().map(|d| d.id);
        let dir_key = directory.as_ref().map(|d| d.storage_path.as_str()).unwrap_or("");
        let directories = self.repos.directories.list_children(ctx.user_id, dir_id).await?;
        let rows = self.repos.files.list_in_directory(ctx.user_id, dir_id).await?;

        let physical = match self.engine.list_directory(ctx.user_id, dir_key).await {
            Ok(stream) => stream.collect_all().await?,
            Err(err) if err.is(ErrorKind::NotFound) => Vec::new(),
            Err(err) => return Err(err),
        };

        let mut files = Vec::with_capacity(rows.len());
        let mut stale_removed = Vec::new();
        for file in rows {
            if self.engine.exists(ctx.user_id, &file.storage_path).await? {
                files.push(file);
            } else {
                warn!(
                    user_id = %ctx.user_id,
                    file_id = %file.id,
                    name = %file.name,
                    "File content missing; dropping stale record"
                );
                self.repos.files.delete(file.id).await?;
                stale_removed.push(file);
            }
        }

        let known: HashSet<&str> = files
            .iter()
            .map(|f| split_parent(&f.storage_path).1)
            .chain(directories.iter().map(|d| split_parent(&d.storage_path).1))
            .collect();
        let unindexed: Vec<EntryInfo> = physical
            .into_iter()
            .filter(|entry| !known.contains(entry.name.as_str()))
            .collect();
        if !unindexed.is_empty() {
            info!(
                user_id = %ctx.user_id,
                path = %path,
                count = unindexed.len(),
                "Directory holds unindexed entries"
            );
        }

        Ok(DirectoryListing {
            directory,
            directories,
            files,
            unindexed,
            stale_removed,
        })
    }

    /// Renames a directory. Only logical paths change.
    pub async fn rename_directory(
        &self,
        ctx: &RequestContext,
        dir_id: DirectoryId,
        new_name: &str,
    ) -> AppResult<Directory> {
        validate_name(new_name)?;
        let dir = self.find_owned(ctx, dir_id).await?;
        if dir.name == new_name {
            return Ok(dir);
        }

        let (parent_path, _) = split_parent(&dir.path);
        let new_path = join_logical(parent_path, new_name);
        if self
            .repos
            .directories
            .find_by_path(ctx.user_id, &new_path)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!("Directory '{new_path}' already exists")));
        }

        let renamed = self.repos.directories.rename(dir_id, new_name, &new_path).await?;
        info!(
            user_id = %ctx.user_id,
            directory_id = %dir_id,
            from = %dir.path,
            to = %new_path,
            "Directory renamed"
        );
        Ok(renamed)
    }

    /// Deletes an empty directory through the recycle bin.
    ///
    /// Mappings are unlinked instead and yield no recycle item; the external
    /// directory is never touched.
    pub async fn delete_directory(
        &self,
        ctx: &RequestContext,
        dir_id: DirectoryId,
    ) -> AppResult<Option<RecycleItem>> {
        let dir = self.find_owned(ctx, dir_id).await?;
        if !dir.is_mapping {
            return self.recycle.quarantine_directory(ctx, dir_id).await.map(Some);
        }

        match self.engine.unlink_mapping(ctx.user_id, &dir.storage_path).await {
            Ok(()) => {}
            Err(err) if err.is(ErrorKind::NotFound) => {
                warn!(directory_id = %dir_id, "Mapping link already gone");
            }
            Err(err) => return Err(err),
        }
        self.repos.directories.delete(dir_id).await?;
        info!(user_id = %ctx.user_id, directory_id = %dir_id, "Directory mapping removed");
        Ok(None)
    }

    async fn find_owned(&self, ctx: &RequestContext, dir_id: DirectoryId) -> AppResult<Directory> {
        let dir = self
            .repos
            .directories
            .find_by_id(dir_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory {dir_id} not found")))?;
        ctx.ensure_owner(dir.owner_id, "directory")?;
        Ok(dir)
    }

    /// Resolves a parent path to its row. The root is `None`; mappings are
    /// read-only and rejected.
    async fn writable_parent(&self, owner: UserId, parent_path: &str) -> AppResult<Option<Directory>> {
        resolve_writable_dir(&self.repos, owner, parent_path).await
    }
}

/// Validates and sanitizes a directory path. Empty input is the root.
pub(crate) fn normalize_dir_path(path: &str) -> AppResult<String> {
    let path = if path.is_empty() { "/" } else { path };
    validate_path(path)?;
    Ok(sanitize(path))
}

/// Looks up the directory at a sanitized path for writing into it.
pub(crate) async fn resolve_writable_dir(
    repos: &Repositories,
    owner: UserId,
    path: &str,
) -> AppResult<Option<Directory>> {
    if path.is_empty() {
        return Ok(None);
    }
    let dir = repos
        .directories
        .find_by_path(owner, path)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Directory '{path}' not found")))?;
    if dir.is_mapping {
        return Err(AppError::validation(format!(
            "Mapped directory '{path}' is read-only"
        )));
    }
    Ok(Some(dir))
}
