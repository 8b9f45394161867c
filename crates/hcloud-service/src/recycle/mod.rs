//! Recycle bin service.

mod naming;
pub mod service;

pub use service::{PurgeFailure, PurgeReport, RecycleService, RestoredEntry, RestoredTarget};
