//! Share CRUD service.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hcloud_core::error::{AppError, ErrorKind};
use hcloud_core::result::AppResult;
use hcloud_core::types::ShareId;
use hcloud_database::Repositories;
use hcloud_entity::share::{CreateShare, Share, ShareExpiry, ShareTarget, ShareVisibility};
use hcloud_storage::StorageEngine;

use super::link::{LinkService, token_prefix};
use crate::context::RequestContext;
use crate::password::PasswordHasher;

/// Attempts at drawing an unused token before giving up.
const TOKEN_ATTEMPTS: usize = 3;

/// How long a new share stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Valid for this many hours.
    Hours(i64),
    /// Valid for this many days.
    Days(i64),
    /// Never expires.
    Forever,
}

impl ExpiryPolicy {
    /// Resolve to a concrete expiry. Non-positive durations fall back to
    /// `default`.
    pub fn resolve(self, now: DateTime<Utc>, default: Duration) -> ShareExpiry {
        let window = match self {
            Self::Forever => return ShareExpiry::Never,
            Self::Hours(hours) if hours > 0 => Duration::hours(hours),
            Self::Days(days) if days > 0 => Duration::days(days),
            _ => default,
        };
        ShareExpiry::At(now + window)
    }
}

/// Request to create a new share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShareRequest {
    /// What is shared.
    pub target: ShareTarget,
    /// Lifetime; `None` means the configured default.
    pub expiry: Option<ExpiryPolicy>,
    /// Access password; empty or `None` means no password.
    pub password: Option<String>,
    /// Visibility.
    #[serde(default)]
    pub visibility: ShareVisibility,
}

/// A share as listed for its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareSummary {
    /// Share ID.
    pub id: ShareId,
    /// Access token.
    pub token: String,
    /// `file` or `directory`.
    pub target_type: String,
    /// Name of the shared entry, if it still exists.
    pub target_name: Option<String>,
    /// Whether a password is required.
    pub has_password: bool,
    /// Whether the share never expires.
    pub is_permanent: bool,
    /// Expiry instant, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the share has expired.
    pub is_expired: bool,
    /// Successful content resolutions so far.
    pub view_count: i64,
    /// Visibility.
    pub visibility: ShareVisibility,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
}

/// Manages share creation, listing, revocation, and access.
#[derive(Debug, Clone)]
pub struct ShareService {
    pub(super) repos: Repositories,
    pub(super) engine: Arc<StorageEngine>,
    links: Arc<LinkService>,
    pub(super) hasher: Arc<PasswordHasher>,
    default_expiry: Duration,
}

impl ShareService {
    /// Creates a new share service.
    pub fn new(
        repos: Repositories,
        engine: Arc<StorageEngine>,
        links: Arc<LinkService>,
        hasher: Arc<PasswordHasher>,
        default_expiry: Duration,
    ) -> Self {
        Self {
            repos,
            engine,
            links,
            hasher,
            default_expiry,
        }
    }

    /// Creates a new share of a file or directory owned by the caller.
    pub async fn create_share(&self, ctx: &RequestContext, req: CreateShareRequest) -> AppResult<Share> {
        self.target_name(ctx, req.target).await?;

        let password_hash = match req.password.as_deref() {
            Some(password) if !password.is_empty() => Some(self.hasher.hash_password(password)?),
            _ => None,
        };
        let expiry = req
            .expiry
            .unwrap_or(ExpiryPolicy::Hours(0))
            .resolve(ctx.request_time, self.default_expiry);

        let mut last_err = None;
        for _ in 0..TOKEN_ATTEMPTS {
            let data = CreateShare {
                token: self.links.generate_token(),
                owner_id: ctx.user_id,
                target: req.target,
                expiry,
                password_hash: password_hash.clone(),
                visibility: req.visibility,
            };
            match self.repos.shares.create(&data).await {
                Ok(share) => {
                    info!(
                        user_id = %ctx.user_id,
                        share_id = %share.id,
                        token = %token_prefix(&share.token),
                        permanent = share.expires_at.is_none(),
                        "Share created"
                    );
                    return Ok(share);
                }
                Err(err) if err.is(ErrorKind::Conflict) => {
                    warn!(user_id = %ctx.user_id, "Share token collision, drawing a new one");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| AppError::conflict("Could not allocate a share token")))
    }

    /// Lists shares created by the caller, newest first.
    pub async fn list_shares(&self, ctx: &RequestContext) -> AppResult<Vec<ShareSummary>> {
        let shares = self.repos.shares.list_by_owner(ctx.user_id).await?;
        let now = Utc::now();
        let mut summaries = Vec::with_capacity(shares.len());
        for share in shares {
            let target = share.target()?;
            let target_name = self.target_name(ctx, target).await.ok();
            summaries.push(ShareSummary {
                id: share.id,
                target_type: match target {
                    ShareTarget::File(_) => "file",
                    ShareTarget::Directory(_) => "directory",
                }
                .to_string(),
                target_name,
                has_password: share.has_password(),
                is_permanent: share.expires_at.is_none(),
                expires_at: share.expires_at,
                is_expired: share.is_expired_at(now),
                view_count: share.view_count,
                visibility: share.visibility,
                created_at: share.created_at,
                token: share.token,
            });
        }
        Ok(summaries)
    }

    /// Revokes a share. Only its owner may do so.
    pub async fn revoke_share(&self, ctx: &RequestContext, token: &str) -> AppResult<()> {
        let share = self.find_by_token(token).await?;
        ctx.ensure_owner(share.owner_id, "share")?;

        self.repos.shares.delete(share.id).await?;

        info!(
            user_id = %ctx.user_id,
            share_id = %share.id,
            token = %token_prefix(token),
            "Share revoked"
        );
        Ok(())
    }

    pub(super) async fn find_by_token(&self, token: &str) -> AppResult<Share> {
        self.repos
            .shares
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::not_found("Share link not found"))
    }

    /// Name of an owned share target; `NotFound` or `Forbidden` otherwise.
    async fn target_name(&self, ctx: &RequestContext, target: ShareTarget) -> AppResult<String> {
        match target {
            ShareTarget::File(file_id) => {
                let file = self
                    .repos
                    .files
                    .find_by_id(file_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
                ctx.ensure_owner(file.owner_id, "file")?;
                Ok(file.name)
            }
            ShareTarget::Directory(dir_id) => {
                let dir = self
                    .repos
                    .directories
                    .find_by_id(dir_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Directory {dir_id} not found")))?;
                ctx.ensure_owner(dir.owner_id, "directory")?;
                Ok(dir.name)
            }
        }
    }
}
