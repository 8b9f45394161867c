//! Search a user's files and directories.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use hcloud_core::config::AppConfig;
use hcloud_core::error::AppError;
use hcloud_entity::directory::Directory;
use hcloud_entity::file::File;
use hcloud_service::{RequestContext, SearchService};
use hcloud_storage::FileCategory;

use super::Backend;

/// Arguments for search
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Owner user ID
    #[arg(short, long)]
    pub user: String,
    /// Name fragment to look for
    #[arg(required_unless_present = "kind")]
    pub query: Option<String>,
    /// List files of one category instead (image, document, video, audio, archive)
    #[arg(short = 't', long = "type", conflicts_with = "query")]
    pub kind: Option<FileCategory>,
}

/// Search hit display row
#[derive(Debug, Serialize, Tabled)]
struct HitRow {
    /// Kind
    kind: &'static str,
    /// Name
    name: String,
    /// Size
    size: String,
    /// Type
    content_type: String,
}

impl From<&File> for HitRow {
    fn from(file: &File) -> Self {
        Self {
            kind: "file",
            name: file.name.clone(),
            size: output::human_bytes(file.size_bytes.max(0) as u64),
            content_type: file.content_type.clone(),
        }
    }
}

impl From<&Directory> for HitRow {
    fn from(dir: &Directory) -> Self {
        Self {
            kind: "directory",
            name: dir.path.clone(),
            size: "-".to_string(),
            content_type: "-".to_string(),
        }
    }
}

/// Execute search
pub async fn execute(
    args: &SearchArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let ctx = RequestContext::user(super::parse_user(&args.user)?);
    let backend = Backend::connect(config).await?;
    let search = SearchService::new(backend.repos.clone());

    let result = match (args.kind, args.query.as_deref()) {
        (Some(kind), _) => search.search_by_type(&ctx, kind).await.map(|files| {
            let rows: Vec<HitRow> = files.iter().map(HitRow::from).collect();
            output::print_list(&rows, format);
        }),
        (None, query) => search
            .search(&ctx, query.unwrap_or_default())
            .await
            .map(|results| {
                let rows: Vec<HitRow> = results
                    .directories
                    .iter()
                    .map(HitRow::from)
                    .chain(results.files.iter().map(HitRow::from))
                    .collect();
                output::print_list(&rows, format);
            }),
    };

    backend.pool.close().await;
    result
}
