//! Storage inspection commands.

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{self, OutputFormat};
use hcloud_core::config::AppConfig;
use hcloud_core::error::AppError;
use hcloud_storage::StorageEngine;

/// Arguments for storage commands
#[derive(Debug, Args)]
pub struct StorageArgs {
    /// Storage subcommand
    #[command(subcommand)]
    pub command: StorageCommand,
}

/// Storage subcommands
#[derive(Debug, Subcommand)]
pub enum StorageCommand {
    /// Show the configured roots and disk usage of the storage volume
    Info,
}

#[derive(Debug, Serialize)]
struct StorageReport<'a> {
    storage_path: &'a str,
    mapped_path: &'a str,
    recycle_path: &'a str,
    total: u64,
    used: u64,
    free: u64,
    used_percent: f64,
}

/// Execute storage commands
pub async fn execute(
    args: &StorageArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        StorageCommand::Info => {
            let engine = StorageEngine::new(&config.storage).await?;
            let info = engine.system_storage_info().await?;
            let report = StorageReport {
                storage_path: &config.storage.storage_path,
                mapped_path: &config.storage.mapped_path,
                recycle_path: &config.storage.recycle_path,
                total: info.total,
                used: info.used,
                free: info.free,
                used_percent: info.used_percent(),
            };

            match format {
                OutputFormat::Json => output::print_json(&report),
                OutputFormat::Table => {
                    println!("Storage:");
                    output::print_kv("Storage root", report.storage_path);
                    output::print_kv("Mapped root", report.mapped_path);
                    output::print_kv("Recycle root", report.recycle_path);
                    output::print_kv("Total", &output::human_bytes(report.total));
                    output::print_kv("Used", &output::human_bytes(report.used));
                    output::print_kv("Free", &output::human_bytes(report.free));
                    output::print_kv("Used %", &format!("{:.1}", report.used_percent));
                    if report.used_percent >= 90.0 {
                        output::print_warning("Storage volume is over 90% full.");
                    }
                }
            }
        }
    }
    Ok(())
}
