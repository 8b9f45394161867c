//! Recycle bin configuration.

use serde::{Deserialize, Serialize};

/// How long quarantined items are kept and how often they are swept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleConfig {
    /// Days an item stays restorable before it becomes purgeable.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Six-field cron expression for the expiry sweep.
    #[serde(default = "default_sweep_schedule")]
    pub sweep_schedule: String,
    /// Whether the server runs the sweep at all.
    #[serde(default = "default_true")]
    pub sweep_enabled: bool,
}

impl RecycleConfig {
    /// Retention window as a duration.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days.max(0))
    }
}

impl Default for RecycleConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            sweep_schedule: default_sweep_schedule(),
            sweep_enabled: true,
        }
    }
}

fn default_retention_days() -> i64 {
    30
}

fn default_sweep_schedule() -> String {
    "0 0 * * * *".to_string()
}

fn default_true() -> bool {
    true
}
