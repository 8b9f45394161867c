//! Share repository.

use async_trait::async_trait;
use sqlx::PgPool;

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_core::types::{ShareId, UserId};
use hcloud_entity::share::{CreateShare, Share};

use super::{read_error, write_error};

/// Persistence for share links.
#[async_trait]
pub trait ShareRepository: Send + Sync + 'static {
    /// Find a share by ID.
    async fn find_by_id(&self, id: ShareId) -> AppResult<Option<Share>>;

    /// Find a share by token, expired or not.
    async fn find_by_token(&self, token: &str) -> AppResult<Option<Share>>;

    /// List shares created by a user, newest first.
    async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Share>>;

    /// Insert a share. A duplicate token is a conflict.
    async fn create(&self, data: &CreateShare) -> AppResult<Share>;

    /// Atomically add one view and return the new count.
    async fn increment_view_count(&self, id: ShareId) -> AppResult<i64>;

    /// Delete a share.
    async fn delete(&self, id: ShareId) -> AppResult<bool>;
}

/// PostgreSQL implementation of [`ShareRepository`].
#[derive(Debug, Clone)]
pub struct PgShareRepository {
    pool: PgPool,
}

impl PgShareRepository {
    /// Create a new share repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareRepository for PgShareRepository {
    async fn find_by_id(&self, id: ShareId) -> AppResult<Option<Share>> {
        sqlx::query_as::<_, Share>("SELECT * FROM shares WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| read_error(e, "Failed to find share"))
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<Share>> {
        sqlx::query_as::<_, Share>("SELECT * FROM shares WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| read_error(e, "Failed to find share by token"))
    }

    async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Share>> {
        sqlx::query_as::<_, Share>(
            "SELECT * FROM shares WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to list shares"))
    }

    async fn create(&self, data: &CreateShare) -> AppResult<Share> {
        let (file_id, directory_id) = data.target.into_ids();
        sqlx::query_as::<_, Share>(
            "INSERT INTO shares \
             (id, token, owner_id, file_id, directory_id, expires_at, password_hash, visibility) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(ShareId::new())
        .bind(&data.token)
        .bind(data.owner_id)
        .bind(file_id)
        .bind(directory_id)
        .bind(data.expiry.as_column())
        .bind(&data.password_hash)
        .bind(data.visibility)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                "shares_token_key",
                || "Share token already in use".to_string(),
                "Failed to create share",
            )
        })
    }

    async fn increment_view_count(&self, id: ShareId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE shares SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to count share view"))?
        .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))
    }

    async fn delete(&self, id: ShareId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM shares WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| read_error(e, "Failed to delete share"))?;
        Ok(result.rows_affected() > 0)
    }
}
