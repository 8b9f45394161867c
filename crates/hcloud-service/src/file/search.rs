//! Name and type search over a user's files and directories.

use serde::{Deserialize, Serialize};
use tracing::debug;

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_database::Repositories;
use hcloud_entity::directory::Directory;
use hcloud_entity::file::File;
use hcloud_storage::FileCategory;

use crate::context::RequestContext;

/// Matches for one search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matching files, by name.
    pub files: Vec<File>,
    /// Matching directories, by path.
    pub directories: Vec<Directory>,
}

impl SearchResults {
    /// Number of matches.
    pub fn total(&self) -> usize {
        self.files.len() + self.directories.len()
    }
}

/// Searches within the caller's own namespace.
#[derive(Debug, Clone)]
pub struct SearchService {
    repos: Repositories,
}

impl SearchService {
    /// Creates a new search service.
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Files and directories whose name contains `query`, ignoring case.
    pub async fn search(&self, ctx: &RequestContext, query: &str) -> AppResult<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("Search query cannot be empty"));
        }

        let files = self.repos.files.search_by_name(ctx.user_id, query).await?;
        let directories = self
            .repos
            .directories
            .search_by_name(ctx.user_id, query)
            .await?;
        let results = SearchResults { files, directories };
        debug!(user_id = %ctx.user_id, query = %query, total = results.total(), "Search finished");
        Ok(results)
    }

    /// Files whose content type belongs to `category`.
    ///
    /// Code and unclassified content have no reliable content-type family
    /// and are rejected.
    pub async fn search_by_type(
        &self,
        ctx: &RequestContext,
        category: FileCategory,
    ) -> AppResult<Vec<File>> {
        let prefixes = content_type_prefixes(category).ok_or_else(|| {
            AppError::validation(format!("Searching by type '{category}' is not supported"))
        })?;
        let files = self
            .repos
            .files
            .search_by_content_type(ctx.user_id, prefixes)
            .await?;
        debug!(user_id = %ctx.user_id, category = %category, total = files.len(), "Type search finished");
        Ok(files)
    }
}

fn content_type_prefixes(category: FileCategory) -> Option<&'static [&'static str]> {
    match category {
        FileCategory::Image => Some(&["image/"]),
        FileCategory::Video => Some(&["video/"]),
        FileCategory::Audio => Some(&["audio/"]),
        FileCategory::Document => Some(&[
            "application/pdf",
            "text/",
            "application/msword",
            "application/rtf",
            "application/vnd.openxmlformats",
            "application/vnd.ms-",
        ]),
        FileCategory::Archive => Some(&[
            "application/zip",
            "application/x-rar",
            "application/vnd.rar",
            "application/x-tar",
            "application/x-7z",
            "application/gzip",
            "application/x-bzip",
        ]),
        FileCategory::Code | FileCategory::Other => None,
    }
}
