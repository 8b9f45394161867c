//! File repository.

use async_trait::async_trait;
use sqlx::PgPool;

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_core::types::{DirectoryId, FileId, UserId};
use hcloud_entity::file::{CreateFile, File};

use super::{contains_pattern, escape_like, read_error, write_error};

/// Persistence for file metadata.
#[async_trait]
pub trait FileRepository: Send + Sync + 'static {
    /// Find a file by ID.
    async fn find_by_id(&self, id: FileId) -> AppResult<Option<File>>;

    /// Find a file by name inside a directory (None is the user root).
    async fn find_by_name(
        &self,
        owner_id: UserId,
        directory_id: Option<DirectoryId>,
        name: &str,
    ) -> AppResult<Option<File>>;

    /// List files directly inside a directory.
    async fn list_in_directory(
        &self,
        owner_id: UserId,
        directory_id: Option<DirectoryId>,
    ) -> AppResult<Vec<File>>;

    /// Files of an owner whose name contains `query`, ignoring case.
    async fn search_by_name(&self, owner_id: UserId, query: &str) -> AppResult<Vec<File>>;

    /// Files of an owner whose content type starts with any of `prefixes`.
    async fn search_by_content_type(
        &self,
        owner_id: UserId,
        prefixes: &[&str],
    ) -> AppResult<Vec<File>>;

    /// Insert a file. A duplicate name in the same directory is a conflict.
    async fn create(&self, data: &CreateFile) -> AppResult<File>;

    /// Change the logical name of a file.
    async fn rename(&self, id: FileId, new_name: &str) -> AppResult<File>;

    /// Delete a file row. Shares pointing at it go with it.
    async fn delete(&self, id: FileId) -> AppResult<bool>;
}

/// PostgreSQL implementation of [`FileRepository`].
#[derive(Debug, Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const UNIQUE_NAME: &str = "files_owner_directory_name_key";

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn find_by_id(&self, id: FileId) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| read_error(e, "Failed to find file"))
    }

    async fn find_by_name(
        &self,
        owner_id: UserId,
        directory_id: Option<DirectoryId>,
        name: &str,
    ) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner_id = $1 AND directory_id IS NOT DISTINCT FROM $2 AND name = $3",
        )
        .bind(owner_id)
        .bind(directory_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to find file by name"))
    }

    async fn list_in_directory(
        &self,
        owner_id: UserId,
        directory_id: Option<DirectoryId>,
    ) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner_id = $1 AND directory_id IS NOT DISTINCT FROM $2 \
             ORDER BY name ASC",
        )
        .bind(owner_id)
        .bind(directory_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to list files"))
    }

    async fn search_by_name(&self, owner_id: UserId, query: &str) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner_id = $1 AND name ILIKE $2 ESCAPE '\\' \
             ORDER BY name ASC",
        )
        .bind(owner_id)
        .bind(contains_pattern(query))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to search files"))
    }

    async fn search_by_content_type(
        &self,
        owner_id: UserId,
        prefixes: &[&str],
    ) -> AppResult<Vec<File>> {
        let patterns: Vec<String> = prefixes
            .iter()
            .map(|prefix| format!("{}%", escape_like(prefix)))
            .collect();
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner_id = $1 AND content_type LIKE ANY($2) \
             ORDER BY name ASC",
        )
        .bind(owner_id)
        .bind(patterns)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to search files by type"))
    }

    async fn create(&self, data: &CreateFile) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "INSERT INTO files \
             (id, owner_id, directory_id, name, storage_path, size_bytes, content_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(FileId::new())
        .bind(data.owner_id)
        .bind(data.directory_id)
        .bind(&data.name)
        .bind(&data.storage_path)
        .bind(data.size_bytes)
        .bind(&data.content_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                UNIQUE_NAME,
                || format!("File '{}' already exists", data.name),
                "Failed to create file",
            )
        })
    }

    async fn rename(&self, id: FileId, new_name: &str) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(new_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                UNIQUE_NAME,
                || format!("File '{new_name}' already exists"),
                "Failed to rename file",
            )
        })?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn delete(&self, id: FileId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| read_error(e, "Failed to delete file"))?;
        Ok(result.rows_affected() > 0)
    }
}
