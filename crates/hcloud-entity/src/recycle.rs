//! Recycle bin entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use hcloud_core::types::{RecycleItemId, UserId};

/// Kind of entry held in quarantine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recycle_item_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecycleItemType {
    /// A file.
    File,
    /// A directory.
    Directory,
}

/// A soft-deleted file or directory awaiting restore or purge.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecycleItem {
    /// Unique item identifier.
    pub id: RecycleItemId,
    /// Owner of the deleted entry.
    pub owner_id: UserId,
    /// Entry name at deletion time.
    pub original_name: String,
    /// Logical path at deletion time.
    pub original_path: String,
    /// Physical key the content was moved out of.
    pub restore_path: String,
    /// Physical key inside the owner's quarantine root.
    pub quarantine_path: String,
    /// Size in bytes (0 for directories).
    pub size_bytes: i64,
    /// MIME type for files.
    pub content_type: Option<String>,
    /// File or directory.
    pub item_type: RecycleItemType,
    /// When the entry was deleted.
    pub deleted_at: DateTime<Utc>,
    /// When the entry becomes purgeable.
    pub expire_at: DateTime<Utc>,
}

impl RecycleItem {
    /// Whether the sweep may purge this item at `now`.
    pub fn is_purgeable_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at <= now
    }
}

/// Data required to record a quarantined entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecycleItem {
    /// Pre-generated id; it is also part of the quarantine key.
    pub id: RecycleItemId,
    /// Owner.
    pub owner_id: UserId,
    /// Entry name.
    pub original_name: String,
    /// Logical path.
    pub original_path: String,
    /// Physical source key.
    pub restore_path: String,
    /// Physical quarantine key.
    pub quarantine_path: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// MIME type for files.
    pub content_type: Option<String>,
    /// File or directory.
    pub item_type: RecycleItemType,
    /// Deletion instant.
    pub deleted_at: DateTime<Utc>,
    /// Purge-eligibility instant.
    pub expire_at: DateTime<Utc>,
}
