//! Directory entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use hcloud_core::types::{DirectoryId, UserId};

/// A directory in a user's namespace.
///
/// `path` is the logical location and changes on rename. `storage_path`
/// is the physical key under the user's storage root and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Directory {
    /// Unique directory identifier.
    pub id: DirectoryId,
    /// The directory owner.
    pub owner_id: UserId,
    /// Parent directory (None at the user root).
    pub parent_id: Option<DirectoryId>,
    /// Directory name.
    pub name: String,
    /// Logical path relative to the user root, e.g. `docs/2024`.
    pub path: String,
    /// Physical key relative to the user's storage root.
    pub storage_path: String,
    /// Whether this entry is a link to an external directory.
    pub is_mapping: bool,
    /// Absolute source of a mapping.
    pub mapping_target: Option<String>,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
    /// When the directory was last renamed.
    pub updated_at: DateTime<Utc>,
}

impl Directory {
    /// Check if this directory sits at the user root.
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data required to create a new directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDirectory {
    /// The directory owner.
    pub owner_id: UserId,
    /// Parent directory.
    pub parent_id: Option<DirectoryId>,
    /// Directory name.
    pub name: String,
    /// Logical path.
    pub path: String,
    /// Physical key.
    pub storage_path: String,
    /// Whether this is a mapping link.
    pub is_mapping: bool,
    /// Mapping source, for mappings only.
    pub mapping_target: Option<String>,
}
