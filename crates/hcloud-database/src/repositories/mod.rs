//! Repository traits for all H-Cloud entities and their PostgreSQL
//! implementations.

pub mod directory;
pub mod file;
pub mod recycle;
pub mod share;

use std::sync::Arc;

use sqlx::PgPool;

use hcloud_core::error::{AppError, ErrorKind};

use crate::memory::MemoryDatabase;

pub use directory::{DirectoryRepository, PgDirectoryRepository};
pub use file::{FileRepository, PgFileRepository};
pub use recycle::{PgRecycleRepository, RecycleRepository};
pub use share::{PgShareRepository, ShareRepository};

/// The full set of repositories a service layer needs.
#[derive(Clone)]
pub struct Repositories {
    /// Directory metadata.
    pub directories: Arc<dyn DirectoryRepository>,
    /// File metadata.
    pub files: Arc<dyn FileRepository>,
    /// Share links.
    pub shares: Arc<dyn ShareRepository>,
    /// Recycle bin items.
    pub recycle: Arc<dyn RecycleRepository>,
}

impl Repositories {
    /// Repositories backed by a PostgreSQL pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            directories: Arc::new(PgDirectoryRepository::new(pool.clone())),
            files: Arc::new(PgFileRepository::new(pool.clone())),
            shares: Arc::new(PgShareRepository::new(pool.clone())),
            recycle: Arc::new(PgRecycleRepository::new(pool)),
        }
    }

    /// Repositories backed by a shared in-memory store.
    pub fn memory(db: MemoryDatabase) -> Self {
        Self {
            directories: Arc::new(db.clone()),
            files: Arc::new(db.clone()),
            shares: Arc::new(db.clone()),
            recycle: Arc::new(db),
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}

/// Map a write error, turning a violation of `constraint` into a conflict.
pub(crate) fn write_error(
    err: sqlx::Error,
    constraint: &str,
    conflict_message: impl FnOnce() -> String,
    context: &'static str,
) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some(constraint) => {
            AppError::conflict(conflict_message())
        }
        _ => AppError::with_source(ErrorKind::Database, context, err),
    }
}

/// Escape `%`, `_` and the escape character itself for a `LIKE` pattern.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `LIKE` pattern matching any value that contains `query`.
pub(crate) fn contains_pattern(query: &str) -> String {
    format!("%{}%", escape_like(query))
}

/// Map a read error.
pub(crate) fn read_error(err: sqlx::Error, context: &'static str) -> AppError {
    AppError::with_source(ErrorKind::Database, context, err)
}
