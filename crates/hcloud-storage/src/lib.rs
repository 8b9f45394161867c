//! # hcloud-storage
//!
//! Everything that touches the server-side filesystem: validation of
//! user-supplied names and paths, upload classification, and the
//! [`StorageEngine`] that maps `(user, key)` pairs to physical locations
//! under the configured roots.

pub mod classify;
pub mod disk;
pub mod engine;
pub mod listing;
pub mod path;
pub mod quarantine;

pub use classify::{Classification, FileCategory, classify};
pub use disk::StorageInfo;
pub use engine::{CreatedDirectory, StorageEngine};
pub use listing::{DirectoryStream, EntryInfo};
