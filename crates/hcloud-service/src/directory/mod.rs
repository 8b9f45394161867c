//! Directory management.

pub mod service;

pub use service::{DirectoryListing, DirectoryService};
pub(crate) use service::{normalize_dir_path, resolve_writable_dir};
