//! Share access control: validates tokens and serves shared content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_core::types::FileId;
use hcloud_entity::file::File;
use hcloud_entity::share::{Share, ShareTarget, ShareVisibility};

use super::link::token_prefix;
use super::service::ShareService;

/// Public metadata about a share, returned without counting a view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareInfo {
    /// Access token.
    pub token: String,
    /// `file` or `directory`.
    pub target_type: String,
    /// Name of the shared entry.
    pub target_name: String,
    /// Size of a shared file, in bytes.
    pub size_bytes: Option<i64>,
    /// Whether a password must be supplied.
    pub has_password: bool,
    /// Whether the share never expires.
    pub is_permanent: bool,
    /// Expiry instant, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Visibility.
    pub visibility: ShareVisibility,
    /// Views so far.
    pub view_count: i64,
}

/// A share resolved to readable content.
#[derive(Debug)]
pub struct ResolvedShare {
    /// The share, with its view count after this access.
    pub share: Share,
    /// The shared file.
    pub file: File,
    /// Open handle to the file's content.
    pub content: fs::File,
}

impl ShareService {
    /// Check a share without counting a view.
    pub async fn check_share(&self, token: &str) -> AppResult<ShareInfo> {
        let share = self.find_by_token(token).await?;
        ensure_live(&share, Utc::now())?;

        let (target_type, target_name, size_bytes) = match share.target()? {
            ShareTarget::File(file_id) => {
                let file = self.shared_file(file_id).await?;
                ("file", file.name, Some(file.size_bytes))
            }
            ShareTarget::Directory(dir_id) => {
                let dir = self
                    .repos
                    .directories
                    .find_by_id(dir_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Shared directory no longer exists"))?;
                ("directory", dir.name, None)
            }
        };

        Ok(ShareInfo {
            target_type: target_type.to_string(),
            target_name,
            size_bytes,
            has_password: share.has_password(),
            is_permanent: share.expires_at.is_none(),
            expires_at: share.expires_at,
            visibility: share.visibility,
            view_count: share.view_count,
            token: share.token,
        })
    }

    /// Check existence, then expiry, then password. Does not count a view.
    pub async fn verify_share(&self, token: &str, password: Option<&str>) -> AppResult<Share> {
        self.verify_share_at(token, password, Utc::now()).await
    }

    async fn verify_share_at(
        &self,
        token: &str,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Share> {
        let share = self.find_by_token(token).await?;
        ensure_live(&share, now)?;

        if let Some(hash) = share.password_hash.as_deref() {
            let supplied = password.unwrap_or_default();
            if supplied.is_empty() || !self.hasher.verify_password(supplied, hash)? {
                debug!(token = %token_prefix(token), "Share password rejected");
                return Err(AppError::forbidden("Invalid share password"));
            }
        }
        Ok(share)
    }

    /// Resolve a share to its file content and count one view.
    pub async fn resolve_share(&self, token: &str, password: Option<&str>) -> AppResult<ResolvedShare> {
        self.resolve_share_at(token, password, Utc::now()).await
    }

    /// [`ShareService::resolve_share`] evaluated at `now`.
    pub async fn resolve_share_at(
        &self,
        token: &str,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<ResolvedShare> {
        let mut share = self.verify_share_at(token, password, now).await?;

        let file_id = match share.target()? {
            ShareTarget::File(file_id) => file_id,
            ShareTarget::Directory(_) => {
                return Err(AppError::not_implemented(
                    "Directory shares cannot be downloaded yet",
                ));
            }
        };
        let file = self.shared_file(file_id).await?;
        let content = self.engine.open_file(file.owner_id, &file.storage_path).await?;

        share.view_count = self.repos.shares.increment_view_count(share.id).await?;

        info!(
            share_id = %share.id,
            token = %token_prefix(token),
            file_id = %file.id,
            view_count = share.view_count,
            "Shared file accessed"
        );
        Ok(ResolvedShare {
            share,
            file,
            content,
        })
    }

    async fn shared_file(&self, file_id: FileId) -> AppResult<File> {
        self.repos
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found("Shared file no longer exists"))
    }
}

fn ensure_live(share: &Share, now: DateTime<Utc>) -> AppResult<()> {
    if share.is_expired_at(now) {
        return Err(AppError::expired("Share link has expired"));
    }
    Ok(())
}
