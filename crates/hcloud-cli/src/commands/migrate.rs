//! Database migration command.

use clap::Args;

use crate::output;
use hcloud_core::config::AppConfig;
use hcloud_core::error::AppError;
use hcloud_database::DatabasePool;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {}

/// Apply all pending migrations
pub async fn execute(_args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    println!("Running database migrations...");
    let result = pool.migrate().await;
    pool.close().await;
    result?;
    output::print_success("All migrations applied successfully.");
    Ok(())
}
