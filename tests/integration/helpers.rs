//! Shared test helpers for integration tests.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Duration;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use hcloud_core::config::{AppConfig, StorageConfig};
use hcloud_core::types::{ByteStream, FileId, UserId};
use hcloud_database::{MemoryDatabase, Repositories};
use hcloud_service::{
    DirectoryService, FileService, LinkService, PasswordHasher, RecycleService, RequestContext,
    ShareService, UploadRequest, UploadedFile,
};
use hcloud_storage::StorageEngine;

/// Test application context
pub struct TestApp {
    /// Keeps the storage roots alive for the test's duration
    pub dir: TempDir,
    /// Application config pointing at `dir`
    pub config: AppConfig,
    /// Repository bundle over the in-memory store
    pub repos: Repositories,
    /// Storage engine over `dir`
    pub engine: Arc<StorageEngine>,
    /// Recycle bin
    pub recycle: Arc<RecycleService>,
    /// File operations
    pub files: Arc<FileService>,
    /// Directory operations
    pub directories: Arc<DirectoryService>,
    /// Share links
    pub shares: Arc<ShareService>,
}

impl TestApp {
    /// Create a new test application with default settings
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = AppConfig {
            storage: StorageConfig::under(dir.path()),
            ..AppConfig::default()
        };

        let engine = Arc::new(
            StorageEngine::new(&config.storage)
                .await
                .expect("Failed to init storage"),
        );
        let repos = Repositories::memory(MemoryDatabase::new());

        let recycle = Arc::new(RecycleService::new(
            repos.clone(),
            Arc::clone(&engine),
            config.recycle.retention(),
        ));
        let files = Arc::new(FileService::new(
            repos.clone(),
            Arc::clone(&engine),
            Arc::clone(&recycle),
        ));
        let directories = Arc::new(DirectoryService::new(
            repos.clone(),
            Arc::clone(&engine),
            Arc::clone(&recycle),
        ));
        let shares = Arc::new(ShareService::new(
            repos.clone(),
            Arc::clone(&engine),
            Arc::new(LinkService::new(config.share.token_bytes)),
            Arc::new(PasswordHasher::new()),
            Duration::hours(config.share.default_expire_hours),
        ));

        Self {
            dir,
            config,
            repos,
            engine,
            recycle,
            files,
            directories,
            shares,
        }
    }

    /// Upload `data` as `name` into `dir_path`
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        dir_path: &str,
        name: &str,
        data: &[u8],
    ) -> UploadedFile {
        self.files
            .upload(ctx, upload_request(dir_path, name, data))
            .await
            .expect("Upload failed")
    }

    /// Read a file's full content through the file service
    pub async fn read(&self, ctx: &RequestContext, file_id: FileId) -> Vec<u8> {
        let (_, mut handle) = self.files.open(ctx, file_id).await.expect("Open failed");
        let mut buf = Vec::new();
        handle.read_to_end(&mut buf).await.expect("Read failed");
        buf
    }
}

/// A fresh, non-admin caller
pub fn new_user() -> RequestContext {
    RequestContext::user(UserId::new())
}

/// An upload request streaming `data` in 64 KiB chunks
pub fn upload_request(dir_path: &str, name: &str, data: &[u8]) -> UploadRequest {
    let chunks: Vec<Result<Bytes, std::io::Error>> = data
        .chunks(64 * 1024)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
    UploadRequest {
        dir_path: dir_path.to_string(),
        file_name: name.to_string(),
        size: data.len() as u64,
        stream,
    }
}
