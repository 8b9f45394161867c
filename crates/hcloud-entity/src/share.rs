//! Share entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_core::types::{DirectoryId, FileId, ShareId, UserId};

/// Advisory visibility flag of a share link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_visibility", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShareVisibility {
    /// Listed as public to anyone holding the token.
    #[default]
    Public,
    /// Marked private by the owner.
    Private,
}

/// What a share link points at. Exactly one target exists per share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ShareTarget {
    /// A single file.
    File(FileId),
    /// A directory.
    Directory(DirectoryId),
}

impl ShareTarget {
    /// Build a target from a pair of optional ids, requiring exactly one.
    pub fn from_ids(file_id: Option<FileId>, directory_id: Option<DirectoryId>) -> AppResult<Self> {
        match (file_id, directory_id) {
            (Some(id), None) => Ok(Self::File(id)),
            (None, Some(id)) => Ok(Self::Directory(id)),
            (Some(_), Some(_)) => Err(AppError::validation(
                "A share targets either a file or a directory, not both",
            )),
            (None, None) => Err(AppError::validation(
                "A share must target a file or a directory",
            )),
        }
    }

    /// Split into the column pair stored in the `shares` table.
    pub fn into_ids(self) -> (Option<FileId>, Option<DirectoryId>) {
        match self {
            Self::File(id) => (Some(id), None),
            Self::Directory(id) => (None, Some(id)),
        }
    }
}

/// When a share stops being accessible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum ShareExpiry {
    /// Expires at the given instant.
    At(DateTime<Utc>),
    /// Never expires.
    Never,
}

impl ShareExpiry {
    /// Whether the share is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::At(expires_at) => *expires_at <= now,
            Self::Never => false,
        }
    }

    /// The nullable column value.
    pub fn as_column(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(expires_at) => Some(*expires_at),
            Self::Never => None,
        }
    }
}

impl From<Option<DateTime<Utc>>> for ShareExpiry {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Never, Self::At)
    }
}

/// A tokenized link granting read access to a file or directory.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Share {
    /// Unique share identifier.
    pub id: ShareId,
    /// Unguessable hex token.
    pub token: String,
    /// User who created the share.
    pub owner_id: UserId,
    /// Shared file, if the target is a file.
    pub file_id: Option<FileId>,
    /// Shared directory, if the target is a directory.
    pub directory_id: Option<DirectoryId>,
    /// Expiry instant; None for links that never expire.
    pub expires_at: Option<DateTime<Utc>>,
    /// Argon2 hash of the access password.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Advisory visibility.
    pub visibility: ShareVisibility,
    /// Number of times content was served through this link.
    pub view_count: i64,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
}

impl Share {
    /// The typed target of this share.
    pub fn target(&self) -> AppResult<ShareTarget> {
        ShareTarget::from_ids(self.file_id, self.directory_id)
    }

    /// The typed expiry of this share.
    pub fn expiry(&self) -> ShareExpiry {
        self.expires_at.into()
    }

    /// Check whether the share is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry().is_expired_at(now)
    }

    /// Whether the share requires a password.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Data required to create a new share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShare {
    /// The share token.
    pub token: String,
    /// The owner.
    pub owner_id: UserId,
    /// The shared resource.
    pub target: ShareTarget,
    /// Expiry policy.
    pub expiry: ShareExpiry,
    /// Password hash, if protected.
    pub password_hash: Option<String>,
    /// Advisory visibility.
    pub visibility: ShareVisibility,
}
