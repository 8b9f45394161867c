//! CLI command definitions and dispatch.

pub mod migrate;
pub mod recycle;
pub mod search;
pub mod share;
pub mod storage;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use hcloud_core::config::AppConfig;
use hcloud_core::error::AppError;
use hcloud_database::{DatabasePool, Repositories};
use hcloud_service::{LinkService, PasswordHasher, RecycleService, ShareService};
use hcloud_storage::StorageEngine;

/// H-Cloud administration
#[derive(Debug, Parser)]
#[command(name = "hcloud", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and the environment overlays
    #[arg(short, long, default_value = "config")]
    pub config_dir: PathBuf,

    /// Environment overlay to apply on top of default.toml
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Recycle bin maintenance
    Recycle(recycle::RecycleArgs),
    /// Search a user's files and directories
    Search(search::SearchArgs),
    /// Share link inspection
    Share(share::ShareArgs),
    /// Storage roots and disk usage
    Storage(storage::StorageArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = self.load_config()?;
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Recycle(args) => recycle::execute(args, &config, self.format).await,
            Commands::Search(args) => search::execute(args, &config, self.format).await,
            Commands::Share(args) => share::execute(args, &config, self.format).await,
            Commands::Storage(args) => storage::execute(args, &config, self.format).await,
        }
    }

    fn load_config(&self) -> Result<AppConfig, AppError> {
        AppConfig::load_from(&self.config_dir, &self.env)
    }
}

/// Database pool, repositories, and storage engine for one command run.
pub struct Backend {
    /// Open connection pool; close it when the command is done.
    pub pool: DatabasePool,
    /// Repository bundle over `pool`.
    pub repos: Repositories,
    /// Storage engine over the configured roots.
    pub engine: Arc<StorageEngine>,
}

impl Backend {
    /// Connect to the database and open the storage roots.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let pool = DatabasePool::connect(&config.database).await?;
        let repos = pool.repositories();
        let engine = Arc::new(StorageEngine::new(&config.storage).await?);
        Ok(Self { pool, repos, engine })
    }

    /// Recycle bin service with the configured retention.
    pub fn recycle(&self, config: &AppConfig) -> RecycleService {
        RecycleService::new(
            self.repos.clone(),
            Arc::clone(&self.engine),
            config.recycle.retention(),
        )
    }

    /// Share service with the configured defaults.
    pub fn shares(&self, config: &AppConfig) -> ShareService {
        ShareService::new(
            self.repos.clone(),
            Arc::clone(&self.engine),
            Arc::new(LinkService::new(config.share.token_bytes)),
            Arc::new(PasswordHasher::new()),
            chrono::Duration::hours(config.share.default_expire_hours),
        )
    }
}

/// Parse a user id argument.
pub fn parse_user(raw: &str) -> Result<hcloud_core::types::UserId, AppError> {
    raw.parse()
        .map_err(|e| AppError::validation(format!("Invalid user id '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_parses_global_flags() {
        let cli = Cli::parse_from([
            "hcloud",
            "--config-dir",
            "/etc/hcloud",
            "--env",
            "production",
            "--format",
            "json",
            "storage",
            "info",
        ]);
        assert_eq!(cli.config_dir, PathBuf::from("/etc/hcloud"));
        assert_eq!(cli.env, "production");
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Storage(_)));
    }

    #[test]
    fn test_loads_config_from_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("default.toml"),
            "[recycle]\nretention_days = 7\n",
        )
        .expect("write");
        let cli = Cli::parse_from([
            "hcloud",
            "--config-dir",
            dir.path().to_str().expect("utf8"),
            "migrate",
        ]);
        let config = cli.load_config().expect("config");
        assert_eq!(config.recycle.retention_days, 7);
    }

    #[test]
    fn test_search_takes_a_query_or_a_type() {
        let user = "0190f3a8-3c1e-7cc4-9a3b-5f1d2e3c4b5a";
        let cli = Cli::parse_from(["hcloud", "search", "--user", user, "--type", "image"]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.kind, Some(hcloud_storage::FileCategory::Image));
        assert!(args.query.is_none());

        assert!(Cli::try_parse_from(["hcloud", "search", "--user", user]).is_err());
        assert!(Cli::try_parse_from(["hcloud", "search", "--user", user, "--type", "nope"]).is_err());
    }

    #[test]
    fn test_rejects_malformed_user_id() {
        assert!(parse_user("not-a-uuid").is_err());
        assert!(parse_user("0190f3a8-3c1e-7cc4-9a3b-5f1d2e3c4b5a").is_ok());
    }
}
