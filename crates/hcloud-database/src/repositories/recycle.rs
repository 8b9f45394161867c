//! Recycle bin repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use hcloud_core::result::AppResult;
use hcloud_core::types::{RecycleItemId, UserId};
use hcloud_entity::recycle::{CreateRecycleItem, RecycleItem};

use super::{read_error, write_error};

/// Persistence for quarantined items.
#[async_trait]
pub trait RecycleRepository: Send + Sync + 'static {
    /// Find an item by ID.
    async fn find_by_id(&self, id: RecycleItemId) -> AppResult<Option<RecycleItem>>;

    /// A user's items, most recently deleted first.
    async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<RecycleItem>>;

    /// All items with `expire_at <= now`, across users.
    async fn list_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<RecycleItem>>;

    /// Insert an item.
    async fn create(&self, data: &CreateRecycleItem) -> AppResult<RecycleItem>;

    /// Delete one item.
    async fn delete(&self, id: RecycleItemId) -> AppResult<bool>;

    /// Delete exactly the given items and return how many rows went away.
    async fn delete_many(&self, ids: &[RecycleItemId]) -> AppResult<u64>;
}

/// PostgreSQL implementation of [`RecycleRepository`].
#[derive(Debug, Clone)]
pub struct PgRecycleRepository {
    pool: PgPool,
}

impl PgRecycleRepository {
    /// Create a new recycle repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecycleRepository for PgRecycleRepository {
    async fn find_by_id(&self, id: RecycleItemId) -> AppResult<Option<RecycleItem>> {
        sqlx::query_as::<_, RecycleItem>("SELECT * FROM recycle_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| read_error(e, "Failed to find recycle item"))
    }

    async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<RecycleItem>> {
        sqlx::query_as::<_, RecycleItem>(
            "SELECT * FROM recycle_items WHERE owner_id = $1 ORDER BY deleted_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to list recycle items"))
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<RecycleItem>> {
        sqlx::query_as::<_, RecycleItem>(
            "SELECT * FROM recycle_items WHERE expire_at <= $1 ORDER BY expire_at ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error(e, "Failed to list expired recycle items"))
    }

    async fn create(&self, data: &CreateRecycleItem) -> AppResult<RecycleItem> {
        sqlx::query_as::<_, RecycleItem>(
            "INSERT INTO recycle_items \
             (id, owner_id, original_name, original_path, restore_path, quarantine_path, \
              size_bytes, content_type, item_type, deleted_at, expire_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(data.id)
        .bind(data.owner_id)
        .bind(&data.original_name)
        .bind(&data.original_path)
        .bind(&data.restore_path)
        .bind(&data.quarantine_path)
        .bind(data.size_bytes)
        .bind(&data.content_type)
        .bind(data.item_type)
        .bind(data.deleted_at)
        .bind(data.expire_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                "recycle_items_quarantine_path_key",
                || format!("'{}' is already quarantined", data.original_name),
                "Failed to create recycle item",
            )
        })
    }

    async fn delete(&self, id: RecycleItemId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM recycle_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| read_error(e, "Failed to delete recycle item"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, ids: &[RecycleItemId]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        let result = sqlx::query("DELETE FROM recycle_items WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await
            .map_err(|e| read_error(e, "Failed to delete recycle items"))?;
        Ok(result.rows_affected())
    }
}
