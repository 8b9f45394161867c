//! Storage root configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Filesystem roots managed by the storage engine.
///
/// Each root holds one `user_<id>` subtree per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all runtime data.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Root for uploaded content and created directories.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Root for symlinks that map external directories into a user's tree.
    #[serde(default = "default_mapped_path")]
    pub mapped_path: String,
    /// Quarantine root for recycled content.
    #[serde(default = "default_recycle_path")]
    pub recycle_path: String,
}

impl StorageConfig {
    /// Build a configuration with all roots under a single base directory.
    pub fn under(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let sub = |name: &str| base.join(name).to_string_lossy().into_owned();
        Self {
            data_root: base.to_string_lossy().into_owned(),
            storage_path: sub("storage"),
            mapped_path: sub("mapped"),
            recycle_path: sub("recycle"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            storage_path: default_storage_path(),
            mapped_path: default_mapped_path(),
            recycle_path: default_recycle_path(),
        }
    }
}

fn default_data_root() -> String {
    "./data".to_string()
}

fn default_storage_path() -> String {
    "./data/storage".to_string()
}

fn default_mapped_path() -> String {
    "./data/mapped".to_string()
}

fn default_recycle_path() -> String {
    "./data/recycle".to_string()
}
