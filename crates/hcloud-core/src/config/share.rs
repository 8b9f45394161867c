//! Share link configuration.

use serde::{Deserialize, Serialize};

/// Defaults applied when creating share links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Lifetime in hours when the request names no expiry.
    #[serde(default = "default_expire_hours")]
    pub default_expire_hours: i64,
    /// Random bytes per token; the token is their hex encoding.
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            default_expire_hours: default_expire_hours(),
            token_bytes: default_token_bytes(),
        }
    }
}

fn default_expire_hours() -> i64 {
    24
}

fn default_token_bytes() -> usize {
    16
}
