//! # hcloud-service
//!
//! Business logic service layer for H-Cloud. Each service orchestrates the
//! metadata repositories and the storage engine to implement one group of
//! use cases, and keeps the two consistent when a step fails.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod directory;
pub mod file;
pub mod password;
pub mod recycle;
pub mod share;

#[cfg(test)]
pub(crate) mod testing;

pub use context::RequestContext;
pub use directory::{DirectoryListing, DirectoryService};
pub use file::{FileService, SearchResults, SearchService, UploadRequest, UploadedFile};
pub use password::PasswordHasher;
pub use recycle::{PurgeFailure, PurgeReport, RecycleService, RestoredEntry, RestoredTarget};
pub use share::{
    CreateShareRequest, ExpiryPolicy, LinkService, ResolvedShare, ShareInfo, ShareService,
    ShareSummary,
};
