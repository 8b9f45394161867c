//! # hcloud-database
//!
//! Metadata persistence for H-Cloud. Repository traits are implemented
//! twice: against PostgreSQL through sqlx, and in memory for tests and
//! single-node embedding. Both enforce the same uniqueness rules.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use memory::MemoryDatabase;
pub use repositories::Repositories;
