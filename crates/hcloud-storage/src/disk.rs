//! Capacity of the volume holding the storage root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sysinfo::Disks;
use tracing::debug;

use hcloud_core::error::{AppError, ErrorKind};
use hcloud_core::result::AppResult;

use crate::engine::StorageEngine;

/// Byte counts of a filesystem volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInfo {
    /// Volume size.
    pub total: u64,
    /// `total - free`.
    pub used: u64,
    /// Space available to unprivileged users.
    pub free: u64,
}

impl StorageInfo {
    /// Used space as a percentage of the total.
    pub fn used_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.used as f64 / self.total as f64 * 100.0
        }
    }
}

impl StorageEngine {
    /// Report total, used and free space of the volume holding the storage root.
    pub async fn system_storage_info(&self) -> AppResult<StorageInfo> {
        let root = self.storage_root().to_path_buf();
        tokio::task::spawn_blocking(move || volume_info(&root))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Disk query task failed", e))?
    }
}

fn volume_info(root: &Path) -> AppResult<StorageInfo> {
    let root: PathBuf = std::fs::canonicalize(root).map_err(|e| {
        AppError::with_source(ErrorKind::Storage, "Failed to resolve storage root", e)
    })?;

    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .iter()
        .filter(|disk| root.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().components().count())
        .ok_or_else(|| AppError::storage("No mounted volume contains the storage root"))?;

    let total = disk.total_space();
    let free = disk.available_space().min(total);
    debug!(
        mount = %disk.mount_point().display(),
        total,
        free,
        "Resolved storage volume"
    );
    Ok(StorageInfo {
        total,
        used: total - free,
        free,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_used_percent() {
        let info = StorageInfo {
            total: 200,
            used: 50,
            free: 150,
        };
        assert!((info.used_percent() - 25.0).abs() < f64::EPSILON);
        let empty = StorageInfo {
            total: 0,
            used: 0,
            free: 0,
        };
        assert_eq!(empty.used_percent(), 0.0);
    }
}
