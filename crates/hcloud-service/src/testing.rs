//! Shared fixtures for unit tests: services over a temp directory and the
//! in-memory database.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use tempfile::TempDir;

use hcloud_core::config::StorageConfig;
use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;
use hcloud_core::types::{ByteStream, DirectoryId, FileId, UserId};
use hcloud_database::repositories::{DirectoryRepository, FileRepository};
use hcloud_database::{MemoryDatabase, Repositories};
use hcloud_entity::directory::{CreateDirectory, Directory};
use hcloud_entity::file::{CreateFile, File};
use hcloud_storage::StorageEngine;

use crate::context::RequestContext;
use crate::directory::DirectoryService;
use crate::file::{FileService, UploadRequest, UploadedFile};
use crate::password::PasswordHasher;
use crate::recycle::RecycleService;
use crate::share::{LinkService, ShareService};

pub(crate) struct Harness {
    pub dir: TempDir,
    pub db: MemoryDatabase,
    pub repos: Repositories,
    pub engine: Arc<StorageEngine>,
    pub recycle: Arc<RecycleService>,
    pub files: FileService,
    pub directories: DirectoryService,
    pub shares: ShareService,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = Arc::new(
            StorageEngine::new(&StorageConfig::under(dir.path()))
                .await
                .expect("engine"),
        );
        let db = MemoryDatabase::new();
        let repos = Repositories::memory(db.clone());
        let recycle = Arc::new(RecycleService::new(
            repos.clone(),
            Arc::clone(&engine),
            Duration::days(30),
        ));
        Self {
            files: FileService::new(repos.clone(), Arc::clone(&engine), Arc::clone(&recycle)),
            directories: DirectoryService::new(repos.clone(), Arc::clone(&engine), Arc::clone(&recycle)),
            shares: ShareService::new(
                repos.clone(),
                Arc::clone(&engine),
                Arc::new(LinkService::default()),
                Arc::new(PasswordHasher::new()),
                Duration::hours(24),
            ),
            dir,
            db,
            repos,
            engine,
            recycle,
        }
    }

    pub async fn upload(&self, ctx: &RequestContext, dir_path: &str, name: &str, data: &[u8]) -> UploadedFile {
        self.files
            .upload(ctx, upload_request(dir_path, name, data))
            .await
            .expect("upload")
    }

    /// Recycle service whose file and directory inserts always fail.
    pub fn recycle_without_inserts(&self) -> RecycleService {
        let rejecting = Arc::new(RejectingInserts(self.db.clone()));
        let repos = Repositories {
            files: rejecting.clone(),
            directories: rejecting,
            ..self.repos.clone()
        };
        RecycleService::new(repos, Arc::clone(&self.engine), Duration::days(30))
    }

    pub async fn read(&self, ctx: &RequestContext, file: hcloud_core::types::FileId) -> Vec<u8> {
        use tokio::io::AsyncReadExt;
        let (_, mut handle) = self.files.open(ctx, file).await.expect("open");
        let mut buf = Vec::new();
        handle.read_to_end(&mut buf).await.expect("read");
        buf
    }
}

pub(crate) fn user() -> RequestContext {
    RequestContext::user(UserId::new())
}

pub(crate) fn stream_of(data: &[u8]) -> ByteStream {
    let chunks: Vec<Result<Bytes, std::io::Error>> = data
        .chunks(7)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    Box::pin(futures::stream::iter(chunks))
}

pub(crate) fn upload_request(dir_path: &str, name: &str, data: &[u8]) -> UploadRequest {
    UploadRequest {
        dir_path: dir_path.to_string(),
        file_name: name.to_string(),
        size: data.len() as u64,
        stream: stream_of(data),
    }
}

/// Delegates to the in-memory store but refuses every insert.
pub(crate) struct RejectingInserts(pub MemoryDatabase);

fn insert_refused() -> AppError {
    AppError::database("insert refused")
}

#[async_trait]
impl FileRepository for RejectingInserts {
    async fn find_by_id(&self, id: FileId) -> AppResult<Option<File>> {
        FileRepository::find_by_id(&self.0, id).await
    }

    async fn find_by_name(
        &self,
        owner_id: UserId,
        directory_id: Option<DirectoryId>,
        name: &str,
    ) -> AppResult<Option<File>> {
        self.0.find_by_name(owner_id, directory_id, name).await
    }

    async fn list_in_directory(
        &self,
        owner_id: UserId,
        directory_id: Option<DirectoryId>,
    ) -> AppResult<Vec<File>> {
        self.0.list_in_directory(owner_id, directory_id).await
    }

    async fn search_by_name(&self, owner_id: UserId, query: &str) -> AppResult<Vec<File>> {
        FileRepository::search_by_name(&self.0, owner_id, query).await
    }

    async fn search_by_content_type(
        &self,
        owner_id: UserId,
        prefixes: &[&str],
    ) -> AppResult<Vec<File>> {
        self.0.search_by_content_type(owner_id, prefixes).await
    }

    async fn create(&self, _data: &CreateFile) -> AppResult<File> {
        Err(insert_refused())
    }

    async fn rename(&self, id: FileId, new_name: &str) -> AppResult<File> {
        FileRepository::rename(&self.0, id, new_name).await
    }

    async fn delete(&self, id: FileId) -> AppResult<bool> {
        FileRepository::delete(&self.0, id).await
    }
}

#[async_trait]
impl DirectoryRepository for RejectingInserts {
    async fn find_by_id(&self, id: DirectoryId) -> AppResult<Option<Directory>> {
        DirectoryRepository::find_by_id(&self.0, id).await
    }

    async fn find_by_path(&self, owner_id: UserId, path: &str) -> AppResult<Option<Directory>> {
        self.0.find_by_path(owner_id, path).await
    }

    async fn list_children(
        &self,
        owner_id: UserId,
        parent_id: Option<DirectoryId>,
    ) -> AppResult<Vec<Directory>> {
        self.0.list_children(owner_id, parent_id).await
    }

    async fn create(&self, _data: &CreateDirectory) -> AppResult<Directory> {
        Err(insert_refused())
    }

    async fn search_by_name(&self, owner_id: UserId, query: &str) -> AppResult<Vec<Directory>> {
        DirectoryRepository::search_by_name(&self.0, owner_id, query).await
    }

    async fn rename(&self, id: DirectoryId, new_name: &str, new_path: &str) -> AppResult<Directory> {
        DirectoryRepository::rename(&self.0, id, new_name, new_path).await
    }

    async fn delete(&self, id: DirectoryId) -> AppResult<bool> {
        DirectoryRepository::delete(&self.0, id).await
    }

    async fn count_entries(&self, id: DirectoryId) -> AppResult<u64> {
        self.0.count_entries(id).await
    }
}
