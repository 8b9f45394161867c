//! # hcloud-entity
//!
//! Domain entity models for H-Cloud. Every struct in this crate represents
//! a database table row or a domain value object. Database entities derive
//! `sqlx::FromRow`; each has a matching `Create*` struct carrying the
//! caller-supplied columns.

pub mod directory;
pub mod file;
pub mod recycle;
pub mod share;

pub use directory::{CreateDirectory, Directory};
pub use file::{CreateFile, File};
pub use recycle::{CreateRecycleItem, RecycleItem, RecycleItemType};
pub use share::{CreateShare, Share, ShareExpiry, ShareTarget, ShareVisibility};
