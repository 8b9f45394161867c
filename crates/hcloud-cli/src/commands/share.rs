//! Share link inspection commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use hcloud_core::config::AppConfig;
use hcloud_core::error::AppError;
use hcloud_service::{RequestContext, ShareSummary};

use super::Backend;

/// Arguments for share commands
#[derive(Debug, Args)]
pub struct ShareArgs {
    /// Share subcommand
    #[command(subcommand)]
    pub command: ShareCommand,
}

/// Share subcommands
#[derive(Debug, Subcommand)]
pub enum ShareCommand {
    /// Show what a token points at without counting a view
    Check {
        /// Share token
        token: String,
    },
    /// List a user's shares
    List {
        /// Owner user ID
        #[arg(short, long)]
        user: String,
    },
    /// Revoke a share on behalf of its owner
    Revoke {
        /// Share token
        token: String,
        /// Owner user ID
        #[arg(short, long)]
        user: String,
    },
}

/// Share display row
#[derive(Debug, Serialize, Tabled)]
struct ShareRow {
    /// Token
    token: String,
    /// Target
    target: String,
    /// Password
    password: String,
    /// Expires
    expires: String,
    /// Views
    views: i64,
}

impl From<&ShareSummary> for ShareRow {
    fn from(share: &ShareSummary) -> Self {
        let expires = match share.expires_at {
            None => "never".to_string(),
            Some(_) if share.is_expired => "expired".to_string(),
            Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        };
        Self {
            token: share.token.clone(),
            target: format!(
                "{} {}",
                share.target_type,
                share.target_name.as_deref().unwrap_or("<missing>")
            ),
            password: if share.has_password { "yes" } else { "no" }.to_string(),
            expires,
            views: share.view_count,
        }
    }
}

/// Execute share commands
pub async fn execute(
    args: &ShareArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let backend = Backend::connect(config).await?;
    let shares = backend.shares(config);

    let result = match &args.command {
        ShareCommand::Check { token } => shares.check_share(token).await.map(|info| match format {
            OutputFormat::Json => output::print_json(&info),
            OutputFormat::Table => {
                output::print_kv("Target", &format!("{} {}", info.target_type, info.target_name));
                if let Some(size) = info.size_bytes {
                    output::print_kv("Size", &output::human_bytes(size.max(0) as u64));
                }
                output::print_kv("Password", if info.has_password { "required" } else { "none" });
                output::print_kv(
                    "Expires",
                    &info
                        .expires_at
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string()),
                );
                output::print_kv("Views", &info.view_count.to_string());
            }
        }),
        ShareCommand::List { user } => {
            let ctx = RequestContext::user(super::parse_user(user)?);
            shares.list_shares(&ctx).await.map(|list| {
                let rows: Vec<ShareRow> = list.iter().map(ShareRow::from).collect();
                output::print_list(&rows, format);
            })
        }
        ShareCommand::Revoke { token, user } => {
            let ctx = RequestContext::user(super::parse_user(user)?);
            shares
                .revoke_share(&ctx, token)
                .await
                .map(|()| output::print_success(&format!("Share {token} revoked.")))
        }
    };

    backend.pool.close().await;
    result
}
