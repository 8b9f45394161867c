//! File management: uploads, reads, renames, deletes, and search.

pub mod search;
pub mod service;
pub mod upload;

pub use search::{SearchResults, SearchService};
pub use service::FileService;
pub use upload::{UploadRequest, UploadedFile};

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use hcloud_core::ErrorKind;
    use hcloud_core::types::{ByteStream, UserId};
    use hcloud_storage::FileCategory;

    use super::UploadRequest;
    use crate::context::RequestContext;
    use crate::testing::{Harness, upload_request, user};

    fn failing_stream() -> ByteStream {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
        ];
        Box::pin(futures::stream::iter(chunks))
    }

    async fn physical_entries(h: &Harness, ctx: &RequestContext, dir_key: &str) -> usize {
        match h.engine.list_directory(ctx.user_id, dir_key).await {
            Ok(stream) => stream.collect_all().await.expect("collect").len(),
            Err(_) => 0,
        }
    }

    #[tokio::test]
    async fn test_upload_round_trip() {
        let h = Harness::new().await;
        let ctx = user();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        let uploaded = h.upload(&ctx, "/", "dump.bin", &data).await;
        assert_eq!(uploaded.category, FileCategory::Other);
        assert_eq!(uploaded.file.size_bytes, data.len() as i64);
        assert_eq!(uploaded.file.content_type, "application/octet-stream");
        assert!(uploaded.file.storage_path.ends_with("_dump.bin"));
        assert_eq!(h.read(&ctx, uploaded.file.id).await, data);
    }

    #[tokio::test]
    async fn test_empty_upload() {
        let h = Harness::new().await;
        let ctx = user();
        let uploaded = h.upload(&ctx, "", "empty.txt", b"").await;
        assert_eq!(uploaded.category, FileCategory::Document);
        assert!(h.read(&ctx, uploaded.file.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_uploads_leave_no_trace() {
        let h = Harness::new().await;
        let ctx = user();
        h.directories.create_directory(&ctx, "/", "in").await.expect("dir");

        let cases = [
            ("in", "setup.exe", ErrorKind::Validation),
            ("in", "../evil.txt", ErrorKind::Validation),
            ("../in", "a.txt", ErrorKind::Validation),
            ("missing", "a.txt", ErrorKind::NotFound),
        ];
        for (dir, name, kind) in cases {
            let err = h
                .files
                .upload(&ctx, upload_request(dir, name, b"data"))
                .await
                .expect_err(name);
            assert_eq!(err.kind, kind, "{dir}/{name}");
        }

        let oversized = UploadRequest {
            dir_path: "in".to_string(),
            file_name: "huge.png".to_string(),
            size: 10 * 1024 * 1024 + 1,
            stream: crate::testing::stream_of(b""),
        };
        let err = h.files.upload(&ctx, oversized).await.expect_err("too large");
        assert_eq!(err.kind, ErrorKind::Validation);

        assert_eq!(physical_entries(&h, &ctx, "in").await, 0);
    }

    #[tokio::test]
    async fn test_failed_stream_removes_partial_file() {
        let h = Harness::new().await;
        let ctx = user();
        h.directories.create_directory(&ctx, "/", "in").await.expect("dir");

        let req = UploadRequest {
            dir_path: "in".to_string(),
            file_name: "broken.txt".to_string(),
            size: 100,
            stream: failing_stream(),
        };
        let err = h.files.upload(&ctx, req).await.expect_err("stream error");
        assert_eq!(err.kind, ErrorKind::Storage);
        assert_eq!(physical_entries(&h, &ctx, "in").await, 0);

        let short = UploadRequest {
            dir_path: "in".to_string(),
            file_name: "short.txt".to_string(),
            size: 100,
            stream: crate::testing::stream_of(b"only a few bytes"),
        };
        let err = h.files.upload(&ctx, short).await.expect_err("size mismatch");
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(physical_entries(&h, &ctx, "in").await, 0);

        let listing = h.directories.list_directory(&ctx, "in").await.expect("list");
        assert!(listing.files.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_name_is_conflict() {
        let h = Harness::new().await;
        let ctx = user();
        h.upload(&ctx, "/", "a.txt", b"1").await;
        let err = h
            .files
            .upload(&ctx, upload_request("/", "a.txt", b"2"))
            .await
            .expect_err("duplicate");
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_rename_keeps_content_and_policy() {
        let h = Harness::new().await;
        let ctx = user();
        let uploaded = h.upload(&ctx, "/", "draft.txt", b"text").await;
        h.upload(&ctx, "/", "taken.txt", b"t").await;

        let renamed = h
            .files
            .rename_file(&ctx, uploaded.file.id, "final.md")
            .await
            .expect("rename");
        assert_eq!(renamed.name, "final.md");
        assert_eq!(renamed.storage_path, uploaded.file.storage_path);
        assert_eq!(h.read(&ctx, renamed.id).await, b"text");

        let err = h
            .files
            .rename_file(&ctx, uploaded.file.id, "final.sh")
            .await
            .expect_err("denied type");
        assert_eq!(err.kind, ErrorKind::Validation);
        let err = h
            .files
            .rename_file(&ctx, uploaded.file.id, "taken.txt")
            .await
            .expect_err("collision");
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_open_checks_ownership() {
        let h = Harness::new().await;
        let owner = user();
        let uploaded = h.upload(&owner, "/", "a.txt", b"a").await;
        let err = h.files.open(&user(), uploaded.file.id).await.expect_err("foreign");
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_force_delete_is_admin_only() {
        let h = Harness::new().await;
        let owner = user();
        let uploaded = h.upload(&owner, "/", "a.txt", b"a").await;

        let err = h.files.force_delete(&owner, uploaded.file.id).await.expect_err("not admin");
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let admin = RequestContext::admin(UserId::new());
        h.files.force_delete(&admin, uploaded.file.id).await.expect("force");
        assert!(h.repos.files.find_by_id(uploaded.file.id).await.expect("find").is_none());
        assert!(!h.engine.exists(owner.user_id, &uploaded.file.storage_path).await.expect("exists"));
        assert!(h.recycle.list_quarantined(&owner).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_storage_stats() {
        let h = Harness::new().await;
        // sandboxed hosts may hide the backing volume
        match h.files.storage_stats().await {
            Ok(stats) => assert_eq!(stats.used + stats.free, stats.total),
            Err(err) => assert_eq!(err.kind, ErrorKind::Storage),
        }
    }
}
