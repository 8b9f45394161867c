//! H-Cloud server
//!
//! Opens the storage roots and metadata database, applies migrations, and
//! runs the scheduled recycle bin sweep until interrupted. Request handling
//! lives in `hcloud-service`, which embedding front ends link directly.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use hcloud_core::config::AppConfig;
use hcloud_core::error::AppError;
use hcloud_database::DatabasePool;
use hcloud_service::RecycleService;
use hcloud_storage::StorageEngine;
use hcloud_worker::{CronScheduler, JobExecutor, RecycleSweepJob};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from `HCLOUD_CONFIG_DIR` (default `config/`) with the
/// overlay named by `HCLOUD_ENV`.
fn load_configuration() -> Result<AppConfig, AppError> {
    let dir = std::env::var("HCLOUD_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let env = std::env::var("HCLOUD_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load_from(std::path::Path::new(&dir), &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting H-Cloud");

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db_pool = DatabasePool::connect(&config.database).await?;
    db_pool.migrate().await?;
    let repos = db_pool.repositories();

    // ── Step 2: Storage roots ────────────────────────────────────
    let engine = Arc::new(StorageEngine::new(&config.storage).await?);
    tracing::info!(
        storage = %config.storage.storage_path,
        mapped = %config.storage.mapped_path,
        recycle = %config.storage.recycle_path,
        "Storage roots ready"
    );

    // ── Step 3: Recycle service ──────────────────────────────────
    let recycle = Arc::new(RecycleService::new(
        repos.clone(),
        Arc::clone(&engine),
        config.recycle.retention(),
    ));
    tracing::info!(retention_days = config.recycle.retention_days, "Recycle bin ready");

    // ── Step 4: Background sweep ─────────────────────────────────
    let mut executor = JobExecutor::new();
    executor.register(Arc::new(RecycleSweepJob::new(Arc::clone(&recycle))));
    let executor = Arc::new(executor);

    let mut scheduler = CronScheduler::new(Arc::clone(&executor)).await?;
    scheduler.register_default_tasks(&config.recycle).await?;
    scheduler.start().await?;

    match engine.system_storage_info().await {
        Ok(info) => tracing::info!(
            total = info.total,
            free = info.free,
            used_percent = info.used_percent(),
            "Storage volume"
        ),
        Err(e) => tracing::warn!(error = %e, "Could not read storage volume usage"),
    }

    tracing::info!("H-Cloud running; press Ctrl+C to stop");

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    scheduler.shutdown().await?;
    db_pool.close().await;

    tracing::info!("H-Cloud shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
