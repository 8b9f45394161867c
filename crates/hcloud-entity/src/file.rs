//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use hcloud_core::types::{DirectoryId, FileId, UserId};

/// A file stored in H-Cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: FileId,
    /// The file owner.
    pub owner_id: UserId,
    /// The directory containing this file (None at the user root).
    pub directory_id: Option<DirectoryId>,
    /// Logical file name (including extension).
    pub name: String,
    /// Physical key relative to the user's storage root.
    pub storage_path: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type derived from the extension.
    pub content_type: String,
    /// When the file was uploaded.
    pub created_at: DateTime<Utc>,
    /// When the file was last renamed.
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.name)
            .map(|ext| ext.to_lowercase())
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// The file owner.
    pub owner_id: UserId,
    /// The containing directory.
    pub directory_id: Option<DirectoryId>,
    /// The file name.
    pub name: String,
    /// Physical key.
    pub storage_path: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_named(name: &str) -> File {
        File {
            id: FileId::new(),
            owner_id: UserId::new(),
            directory_id: None,
            name: name.to_string(),
            storage_path: format!("1_{name}"),
            size_bytes: 0,
            content_type: "application/octet-stream".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(file_named("Report.PDF").extension().as_deref(), Some("pdf"));
        assert_eq!(file_named("archive.tar.gz").extension().as_deref(), Some("gz"));
        assert_eq!(file_named("Makefile").extension(), None);
    }
}
