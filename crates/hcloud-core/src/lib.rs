//! # hcloud-core
//!
//! Core crate for H-Cloud. Contains configuration schemas, typed
//! identifiers, the byte stream alias shared by storage and services,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other H-Cloud crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
