//! Recycle bin maintenance commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use hcloud_core::config::AppConfig;
use hcloud_core::error::AppError;
use hcloud_entity::recycle::{RecycleItem, RecycleItemType};
use hcloud_service::{PurgeReport, RequestContext};

use super::Backend;

/// Arguments for recycle commands
#[derive(Debug, Args)]
pub struct RecycleArgs {
    /// Recycle subcommand
    #[command(subcommand)]
    pub command: RecycleCommand,
}

/// Recycle subcommands
#[derive(Debug, Subcommand)]
pub enum RecycleCommand {
    /// List a user's quarantined entries
    List {
        /// Owner user ID
        #[arg(short, long)]
        user: String,
    },
    /// Purge every quarantined entry of a user
    Empty {
        /// Owner user ID
        #[arg(short, long)]
        user: String,
    },
    /// Purge all entries past their retention, for every user
    PurgeExpired,
}

/// Recycle item display row
#[derive(Debug, Serialize, Tabled)]
struct RecycleRow {
    /// Item ID
    id: String,
    /// Kind
    kind: String,
    /// Original path
    path: String,
    /// Size
    size: String,
    /// Deleted at
    deleted_at: String,
    /// Purgeable from
    expires: String,
}

impl From<&RecycleItem> for RecycleRow {
    fn from(item: &RecycleItem) -> Self {
        Self {
            id: item.id.to_string(),
            kind: match item.item_type {
                RecycleItemType::File => "file".to_string(),
                RecycleItemType::Directory => "dir".to_string(),
            },
            path: item.original_path.clone(),
            size: output::human_bytes(item.size_bytes.max(0) as u64),
            deleted_at: item.deleted_at.format("%Y-%m-%d %H:%M").to_string(),
            expires: item.expire_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute recycle commands
pub async fn execute(
    args: &RecycleArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let backend = Backend::connect(config).await?;
    let recycle = backend.recycle(config);

    let result = match &args.command {
        RecycleCommand::List { user } => {
            let ctx = RequestContext::user(super::parse_user(user)?);
            recycle.list_quarantined(&ctx).await.map(|items| {
                let rows: Vec<RecycleRow> = items.iter().map(RecycleRow::from).collect();
                output::print_list(&rows, format);
            })
        }
        RecycleCommand::Empty { user } => {
            let ctx = RequestContext::user(super::parse_user(user)?);
            recycle
                .empty_all(&ctx)
                .await
                .map(|report| print_report(&report, format))
        }
        RecycleCommand::PurgeExpired => recycle
            .purge_expired()
            .await
            .map(|report| print_report(&report, format)),
    };

    backend.pool.close().await;
    result
}

fn print_report(report: &PurgeReport, format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_json(report);
        return;
    }
    output::print_kv("Scanned", &report.scanned.to_string());
    output::print_kv("Purged", &report.purged.to_string());
    if report.failures.is_empty() {
        output::print_success("Recycle bin purge complete.");
    } else {
        for failure in &report.failures {
            output::print_warning(&format!("{}: {}", failure.item_id, failure.error));
        }
    }
}
