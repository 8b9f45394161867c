//! Embedded schema migrations.

use sqlx::PgPool;
use tracing::info;

use hcloud_core::error::{AppError, ErrorKind};
use hcloud_core::result::AppResult;

/// Run all pending database migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    info!("Running database migrations");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to run migrations", e))?;

    info!("Database migrations complete");
    Ok(())
}
