//! Directory repository.

use async_trait::async_trait;
use sqlx::PgPool;

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_core::types::{DirectoryId, UserId};
use hcloud_entity::directory::{CreateDirectory, Directory};

use super::{contains_pattern, read_error, write_error};

/// Persistence for directory entries.
#[async_trait]
pub trait DirectoryRepository: Send + Sync + 'static {
    /// Find a directory by ID.
    async fn find_by_id(&self, id: DirectoryId) -> AppResult<Option<Directory>>;

    /// Find a directory by its logical path.
    async fn find_by_path(&self, owner_id: UserId, path: &str) -> AppResult<Option<Directory>>;

    /// List direct children of `parent_id` (None lists top-level entries).
    async fn list_children(
        &self,
        owner_id: UserId,
        parent_id: Option<DirectoryId>,
    ) -> AppResult<Vec<Directory>>;

    /// Insert a directory. A duplicate `(owner, path)` is a conflict.
    async fn create(&self, data: &CreateDirectory) -> AppResult<Directory>;

    /// Directories of an owner whose name contains `query`, ignoring case.
    async fn search_by_name(&self, owner_id: UserId, query: &str) -> AppResult<Vec<Directory>>;

    /// Change the name and logical path of a directory, rewriting the
    /// logical paths of its descendants.
    async fn rename(&self, id: DirectoryId, new_name: &str, new_path: &str) -> AppResult<Directory>;

    /// Delete a directory row.
    async fn delete(&self, id: DirectoryId) -> AppResult<bool>;

    /// Number of files plus subdirectories directly inside a directory.
    async fn count_entries(&self, id: DirectoryId) -> AppResult<u64>;
}

/// PostgreSQL implementation of [`DirectoryRepository`].
#[derive(Debug, Clone)]
pub struct PgDirectoryRepository {
    pool: PgPool,
}

impl PgDirectoryRepository {
    /// Create a new directory repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const UNIQUE_PATH: &str = "directories_owner_path_key";

#[async_trait]
impl DirectoryRepository for PgDirectoryRepository {
    async fn find_by_id(&self, id: DirectoryId) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>("SELECT * FROM directories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| read_error(e, "Failed to find directory"))
    }

    async fn find_by_path(&self, owner_id: UserId, path: &str) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE owner_id = $1 AND path = $2",
        )
        .bind(owner_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to find directory by path"))
    }

    async fn list_children(
        &self,
        owner_id: UserId,
        parent_id: Option<DirectoryId>,
    ) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 \
             ORDER BY name ASC",
        )
        .bind(owner_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to list directories"))
    }

    async fn search_by_name(&self, owner_id: UserId, query: &str) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories \
             WHERE owner_id = $1 AND name ILIKE $2 ESCAPE '\\' \
             ORDER BY path ASC",
        )
        .bind(owner_id)
        .bind(contains_pattern(query))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to search directories"))
    }

    async fn create(&self, data: &CreateDirectory) -> AppResult<Directory> {
        sqlx::query_as::<_, Directory>(
            "INSERT INTO directories \
             (id, owner_id, parent_id, name, path, storage_path, is_mapping, mapping_target) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(DirectoryId::new())
        .bind(data.owner_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(&data.path)
        .bind(&data.storage_path)
        .bind(data.is_mapping)
        .bind(&data.mapping_target)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                UNIQUE_PATH,
                || format!("Directory '{}' already exists", data.path),
                "Failed to create directory",
            )
        })
    }

    async fn rename(&self, id: DirectoryId, new_name: &str, new_path: &str) -> AppResult<Directory> {
        let conflict = || format!("Directory '{new_path}' already exists");
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| read_error(e, "Failed to begin transaction"))?;

        let current = sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| read_error(e, "Failed to find directory"))?
        .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;

        let prefix = format!("{}/", current.path);
        sqlx::query(
            "UPDATE directories SET path = $3 || substr(path, $4), updated_at = NOW() \
             WHERE owner_id = $1 AND starts_with(path, $2)",
        )
        .bind(current.owner_id)
        .bind(&prefix)
        .bind(format!("{new_path}/"))
        .bind(prefix.chars().count() as i32 + 1)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, UNIQUE_PATH, conflict, "Failed to move descendants"))?;

        let renamed = sqlx::query_as::<_, Directory>(
            "UPDATE directories SET name = $2, path = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(new_name)
        .bind(new_path)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error(e, UNIQUE_PATH, conflict, "Failed to rename directory"))?;

        tx.commit()
            .await
            .map_err(|e| read_error(e, "Failed to commit rename"))?;
        Ok(renamed)
    }

    async fn delete(&self, id: DirectoryId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM directories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| read_error(e, "Failed to delete directory"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_entries(&self, id: DirectoryId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM files WHERE directory_id = $1) \
                  + (SELECT COUNT(*) FROM directories WHERE parent_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to count directory entries"))?;
        Ok(count as u64)
    }
}
