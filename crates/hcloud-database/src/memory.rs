//! In-memory metadata store using a Tokio mutex for single-node deployments
//! and tests.
//!
//! One [`MemoryDatabase`] implements every repository trait over shared
//! state, so cascades and uniqueness checks see all four tables at once.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_core::types::{DirectoryId, FileId, RecycleItemId, ShareId, UserId};
use hcloud_entity::directory::{CreateDirectory, Directory};
use hcloud_entity::file::{CreateFile, File};
use hcloud_entity::recycle::{CreateRecycleItem, RecycleItem};
use hcloud_entity::share::{CreateShare, Share};

use crate::repositories::{DirectoryRepository, FileRepository, RecycleRepository, ShareRepository};

#[derive(Debug, Default)]
struct InnerState {
    directories: HashMap<DirectoryId, Directory>,
    files: HashMap<FileId, File>,
    shares: HashMap<ShareId, Share>,
    recycle: HashMap<RecycleItemId, RecycleItem>,
}

impl InnerState {
    fn path_taken(&self, owner_id: UserId, path: &str, except: Option<DirectoryId>) -> bool {
        self.directories
            .values()
            .any(|d| d.owner_id == owner_id && d.path == path && Some(d.id) != except)
    }

    fn name_taken(
        &self,
        owner_id: UserId,
        directory_id: Option<DirectoryId>,
        name: &str,
        except: Option<FileId>,
    ) -> bool {
        self.files.values().any(|f| {
            f.owner_id == owner_id
                && f.directory_id == directory_id
                && f.name == name
                && Some(f.id) != except
        })
    }
}

/// In-memory implementation of all H-Cloud repositories.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryDatabase {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn matching_files(&self, keep: impl Fn(&File) -> bool) -> Vec<File> {
        let state = self.state.lock().await;
        let mut files: Vec<File> = state.files.values().filter(|f| keep(f)).cloned().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        files
    }
}

#[async_trait]
impl DirectoryRepository for MemoryDatabase {
    async fn find_by_id(&self, id: DirectoryId) -> AppResult<Option<Directory>> {
        Ok(self.state.lock().await.directories.get(&id).cloned())
    }

    async fn find_by_path(&self, owner_id: UserId, path: &str) -> AppResult<Option<Directory>> {
        let state = self.state.lock().await;
        Ok(state
            .directories
            .values()
            .find(|d| d.owner_id == owner_id && d.path == path)
            .cloned())
    }

    async fn list_children(
        &self,
        owner_id: UserId,
        parent_id: Option<DirectoryId>,
    ) -> AppResult<Vec<Directory>> {
        let state = self.state.lock().await;
        let mut children: Vec<Directory> = state
            .directories
            .values()
            .filter(|d| d.owner_id == owner_id && d.parent_id == parent_id)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    async fn search_by_name(&self, owner_id: UserId, query: &str) -> AppResult<Vec<Directory>> {
        let needle = query.to_lowercase();
        let state = self.state.lock().await;
        let mut found: Vec<Directory> = state
            .directories
            .values()
            .filter(|d| d.owner_id == owner_id && d.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }

    async fn create(&self, data: &CreateDirectory) -> AppResult<Directory> {
        let mut state = self.state.lock().await;
        if state.path_taken(data.owner_id, &data.path, None) {
            return Err(AppError::conflict(format!(
                "Directory '{}' already exists",
                data.path
            )));
        }
        if let Some(parent_id) = data.parent_id {
            if !state.directories.contains_key(&parent_id) {
                return Err(AppError::database(format!(
                    "Parent directory {parent_id} does not exist"
                )));
            }
        }

        let now = Utc::now();
        let directory = Directory {
            id: DirectoryId::new(),
            owner_id: data.owner_id,
            parent_id: data.parent_id,
            name: data.name.clone(),
            path: data.path.clone(),
            storage_path: data.storage_path.clone(),
            is_mapping: data.is_mapping,
            mapping_target: data.mapping_target.clone(),
            created_at: now,
            updated_at: now,
        };
        state.directories.insert(directory.id, directory.clone());
        Ok(directory)
    }

    async fn rename(&self, id: DirectoryId, new_name: &str, new_path: &str) -> AppResult<Directory> {
        let mut state = self.state.lock().await;
        let current = state
            .directories
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;

        let old_prefix = format!("{}/", current.path);
        let new_prefix = format!("{new_path}/");
        let moved: Vec<(DirectoryId, String)> = state
            .directories
            .values()
            .filter(|d| d.owner_id == current.owner_id && d.path.starts_with(&old_prefix))
            .map(|d| (d.id, format!("{new_prefix}{}", &d.path[old_prefix.len()..])))
            .collect();

        let taken = state.path_taken(current.owner_id, new_path, Some(id))
            || moved.iter().any(|(moved_id, path)| {
                state.directories.values().any(|d| {
                    d.owner_id == current.owner_id
                        && d.path == *path
                        && d.id != *moved_id
                        && !d.path.starts_with(&old_prefix)
                })
            });
        if taken {
            return Err(AppError::conflict(format!(
                "Directory '{new_path}' already exists"
            )));
        }

        let now = Utc::now();
        for (moved_id, path) in moved {
            if let Some(d) = state.directories.get_mut(&moved_id) {
                d.path = path;
                d.updated_at = now;
            }
        }
        let directory = state
            .directories
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;
        directory.name = new_name.to_string();
        directory.path = new_path.to_string();
        directory.updated_at = now;
        Ok(directory.clone())
    }

    async fn delete(&self, id: DirectoryId) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        if state.files.values().any(|f| f.directory_id == Some(id)) {
            return Err(AppError::database(format!(
                "Directory {id} is still referenced by files"
            )));
        }
        let removed = state.directories.remove(&id).is_some();
        if removed {
            state.shares.retain(|_, s| s.directory_id != Some(id));
            for child in state.directories.values_mut() {
                if child.parent_id == Some(id) {
                    child.parent_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn count_entries(&self, id: DirectoryId) -> AppResult<u64> {
        let state = self.state.lock().await;
        let files = state.files.values().filter(|f| f.directory_id == Some(id)).count();
        let dirs = state
            .directories
            .values()
            .filter(|d| d.parent_id == Some(id))
            .count();
        Ok((files + dirs) as u64)
    }
}

#[async_trait]
impl FileRepository for MemoryDatabase {
    async fn find_by_id(&self, id: FileId) -> AppResult<Option<File>> {
        Ok(self.state.lock().await.files.get(&id).cloned())
    }

    async fn find_by_name(
        &self,
        owner_id: UserId,
        directory_id: Option<DirectoryId>,
        name: &str,
    ) -> AppResult<Option<File>> {
        let state = self.state.lock().await;
        Ok(state
            .files
            .values()
            .find(|f| f.owner_id == owner_id && f.directory_id == directory_id && f.name == name)
            .cloned())
    }

    async fn list_in_directory(
        &self,
        owner_id: UserId,
        directory_id: Option<DirectoryId>,
    ) -> AppResult<Vec<File>> {
        let state = self.state.lock().await;
        let mut files: Vec<File> = state
            .files
            .values()
            .filter(|f| f.owner_id == owner_id && f.directory_id == directory_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn search_by_name(&self, owner_id: UserId, query: &str) -> AppResult<Vec<File>> {
        let needle = query.to_lowercase();
        Ok(self
            .matching_files(|f| f.owner_id == owner_id && f.name.to_lowercase().contains(&needle))
            .await)
    }

    async fn search_by_content_type(
        &self,
        owner_id: UserId,
        prefixes: &[&str],
    ) -> AppResult<Vec<File>> {
        Ok(self
            .matching_files(|f| {
                f.owner_id == owner_id
                    && prefixes.iter().any(|prefix| f.content_type.starts_with(prefix))
            })
            .await)
    }

    async fn create(&self, data: &CreateFile) -> AppResult<File> {
        let mut state = self.state.lock().await;
        if state.name_taken(data.owner_id, data.directory_id, &data.name, None) {
            return Err(AppError::conflict(format!(
                "File '{}' already exists",
                data.name
            )));
        }
        if let Some(directory_id) = data.directory_id {
            if !state.directories.contains_key(&directory_id) {
                return Err(AppError::database(format!(
                    "Directory {directory_id} does not exist"
                )));
            }
        }

        let now = Utc::now();
        let file = File {
            id: FileId::new(),
            owner_id: data.owner_id,
            directory_id: data.directory_id,
            name: data.name.clone(),
            storage_path: data.storage_path.clone(),
            size_bytes: data.size_bytes,
            content_type: data.content_type.clone(),
            created_at: now,
            updated_at: now,
        };
        state.files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn rename(&self, id: FileId, new_name: &str) -> AppResult<File> {
        let mut state = self.state.lock().await;
        let (owner_id, directory_id) = state
            .files
            .get(&id)
            .map(|f| (f.owner_id, f.directory_id))
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        if state.name_taken(owner_id, directory_id, new_name, Some(id)) {
            return Err(AppError::conflict(format!(
                "File '{new_name}' already exists"
            )));
        }
        let file = state
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.name = new_name.to_string();
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn delete(&self, id: FileId) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let removed = state.files.remove(&id).is_some();
        if removed {
            state.shares.retain(|_, s| s.file_id != Some(id));
        }
        Ok(removed)
    }
}

#[async_trait]
impl ShareRepository for MemoryDatabase {
    async fn find_by_id(&self, id: ShareId) -> AppResult<Option<Share>> {
        Ok(self.state.lock().await.shares.get(&id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<Share>> {
        let state = self.state.lock().await;
        Ok(state.shares.values().find(|s| s.token == token).cloned())
    }

    async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Share>> {
        let state = self.state.lock().await;
        let mut shares: Vec<Share> = state
            .shares
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        shares.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shares)
    }

    async fn create(&self, data: &CreateShare) -> AppResult<Share> {
        let mut state = self.state.lock().await;
        if state.shares.values().any(|s| s.token == data.token) {
            return Err(AppError::conflict("Share token already in use"));
        }
        let (file_id, directory_id) = data.target.into_ids();
        let target_exists = match (file_id, directory_id) {
            (Some(id), _) => state.files.contains_key(&id),
            (_, Some(id)) => state.directories.contains_key(&id),
            (None, None) => false,
        };
        if !target_exists {
            return Err(AppError::database("Share target does not exist"));
        }

        let share = Share {
            id: ShareId::new(),
            token: data.token.clone(),
            owner_id: data.owner_id,
            file_id,
            directory_id,
            expires_at: data.expiry.as_column(),
            password_hash: data.password_hash.clone(),
            visibility: data.visibility,
            view_count: 0,
            created_at: Utc::now(),
        };
        state.shares.insert(share.id, share.clone());
        Ok(share)
    }

    async fn increment_view_count(&self, id: ShareId) -> AppResult<i64> {
        let mut state = self.state.lock().await;
        let share = state
            .shares
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))?;
        share.view_count += 1;
        Ok(share.view_count)
    }

    async fn delete(&self, id: ShareId) -> AppResult<bool> {
        Ok(self.state.lock().await.shares.remove(&id).is_some())
    }
}

#[async_trait]
impl RecycleRepository for MemoryDatabase {
    async fn find_by_id(&self, id: RecycleItemId) -> AppResult<Option<RecycleItem>> {
        Ok(self.state.lock().await.recycle.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<RecycleItem>> {
        let state = self.state.lock().await;
        let mut items: Vec<RecycleItem> = state
            .recycle
            .values()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(items)
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<RecycleItem>> {
        let state = self.state.lock().await;
        let mut items: Vec<RecycleItem> = state
            .recycle
            .values()
            .filter(|i| i.is_purgeable_at(now))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.expire_at.cmp(&b.expire_at));
        Ok(items)
    }

    async fn create(&self, data: &CreateRecycleItem) -> AppResult<RecycleItem> {
        let mut state = self.state.lock().await;
        if state
            .recycle
            .values()
            .any(|i| i.id == data.id || i.quarantine_path == data.quarantine_path)
        {
            return Err(AppError::conflict(format!(
                "'{}' is already quarantined",
                data.original_name
            )));
        }
        let item = RecycleItem {
            id: data.id,
            owner_id: data.owner_id,
            original_name: data.original_name.clone(),
            original_path: data.original_path.clone(),
            restore_path: data.restore_path.clone(),
            quarantine_path: data.quarantine_path.clone(),
            size_bytes: data.size_bytes,
            content_type: data.content_type.clone(),
            item_type: data.item_type,
            deleted_at: data.deleted_at,
            expire_at: data.expire_at,
        };
        state.recycle.insert(item.id, item.clone());
        Ok(item)
    }

    async fn delete(&self, id: RecycleItemId) -> AppResult<bool> {
        Ok(self.state.lock().await.recycle.remove(&id).is_some())
    }

    async fn delete_many(&self, ids: &[RecycleItemId]) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter(|id| state.recycle.remove(*id).is_some())
            .count() as u64)
    }
}
