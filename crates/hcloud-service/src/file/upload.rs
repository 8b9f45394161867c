//! File upload.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_core::types::ByteStream;
use hcloud_entity::file::{CreateFile, File};
use hcloud_storage::path::{join_logical, validate_name};
use hcloud_storage::{FileCategory, classify};

use super::service::FileService;
use crate::context::RequestContext;
use crate::directory::{normalize_dir_path, resolve_writable_dir};

/// An upload as received from the boundary layer.
pub struct UploadRequest {
    /// Logical directory path; empty or `/` is the user root.
    pub dir_path: String,
    /// Name of the new file.
    pub file_name: String,
    /// Declared size in bytes. The stream must match it exactly.
    pub size: u64,
    /// File content.
    pub stream: ByteStream,
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("dir_path", &self.dir_path)
            .field("file_name", &self.file_name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A stored upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    /// The new file record.
    pub file: File,
    /// Category the upload was classified into.
    pub category: FileCategory,
}

impl FileService {
    /// Stores an upload and records it.
    ///
    /// Name, type and size are checked before any byte is written. If the
    /// record cannot be inserted the stored content is removed again.
    pub async fn upload(&self, ctx: &RequestContext, req: UploadRequest) -> AppResult<UploadedFile> {
        validate_name(&req.file_name)?;
        let classification = classify(&req.file_name, req.size)?;
        let dir_path = normalize_dir_path(&req.dir_path)?;
        let size_bytes = i64::try_from(req.size)
            .map_err(|_| AppError::validation("Declared size is out of range"))?;

        let directory = resolve_writable_dir(&self.repos, ctx.user_id, &dir_path).await?;
        let directory_id = directory.as_ref().map(|d| d.id);
        if self
            .repos
            .files
            .find_by_name(ctx.user_id, directory_id, &req.file_name)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "File '{}' already exists",
                join_logical(&dir_path, &req.file_name)
            )));
        }

        let dir_key = directory.as_ref().map(|d| d.storage_path.as_str()).unwrap_or("");
        let key = self
            .engine
            .save_file(ctx.user_id, dir_key, &req.file_name, req.size, req.stream)
            .await?;

        let created = self
            .repos
            .files
            .create(&CreateFile {
                owner_id: ctx.user_id,
                directory_id,
                name: req.file_name.clone(),
                storage_path: key.clone(),
                size_bytes,
                content_type: classification.content_type.clone(),
            })
            .await;

        let file = match created {
            Ok(file) => file,
            Err(err) => {
                if let Err(cleanup) = self.engine.delete_file(ctx.user_id, &key).await {
                    warn!(key = %key, error = %cleanup, "Failed to remove content after aborted upload");
                }
                return Err(err);
            }
        };

        info!(
            user_id = %ctx.user_id,
            file_id = %file.id,
            path = %join_logical(&dir_path, &file.name),
            size = file.size_bytes,
            category = %classification.category,
            "File uploaded"
        );
        Ok(UploadedFile {
            file,
            category: classification.category,
        })
    }
}
