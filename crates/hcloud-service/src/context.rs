//! Request context carrying the authenticated caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_core::types::UserId;

/// Context for the current authenticated request.
///
/// Built by the boundary layer after authentication and passed into
/// service methods so that every operation knows who is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// Whether the caller holds administrative rights.
    pub is_admin: bool,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Context for a regular user.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
            request_time: Utc::now(),
        }
    }

    /// Context for an administrator.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            is_admin: true,
            ..Self::user(user_id)
        }
    }

    /// Fail with `Forbidden` unless the caller owns the resource.
    pub fn ensure_owner(&self, owner_id: UserId, what: &str) -> AppResult<()> {
        if owner_id == self.user_id {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("You do not own this {what}")))
        }
    }
}
