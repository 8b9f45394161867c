//! Upload, list, delete, restore, and purge through the public services.

use chrono::Duration;

use hcloud_core::ErrorKind;
use hcloud_entity::recycle::RecycleItemType;
use hcloud_service::RestoredTarget;
use hcloud_storage::FileCategory;

use crate::helpers::{TestApp, new_user, upload_request};

const TWO_MIB: usize = 2 * 1024 * 1024;

#[tokio::test]
async fn test_report_lifecycle_through_retention() {
    let app = TestApp::new().await;
    let ctx = new_user();
    let data: Vec<u8> = (0..TWO_MIB).map(|i| (i % 256) as u8).collect();

    app.directories
        .create_directory(&ctx, "/", "docs")
        .await
        .expect("Failed to create /docs");
    let uploaded = app.upload(&ctx, "/docs", "report.pdf", &data).await;
    assert_eq!(uploaded.category, FileCategory::Document);
    assert_eq!(uploaded.file.content_type, "application/pdf");

    let listing = app
        .directories
        .list_directory(&ctx, "/docs")
        .await
        .expect("Failed to list /docs");
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].name, "report.pdf");
    assert_eq!(listing.files[0].size_bytes, 2_097_152);
    assert!(listing.unindexed.is_empty());

    let item = app
        .files
        .delete_file(&ctx, uploaded.file.id)
        .await
        .expect("Failed to delete");
    assert_eq!(item.item_type, RecycleItemType::File);
    assert_eq!(item.original_path, "docs/report.pdf");
    assert_eq!(item.expire_at - item.deleted_at, app.config.recycle.retention());

    let listing = app.directories.list_directory(&ctx, "docs").await.expect("list");
    assert!(listing.files.is_empty());
    assert_eq!(app.recycle.list_quarantined(&ctx).await.expect("list").len(), 1);

    let report = app
        .recycle
        .purge_expired_at(item.expire_at - Duration::minutes(1))
        .await
        .expect("early sweep");
    assert_eq!(report.purged, 0);

    let report = app
        .recycle
        .purge_expired_at(item.expire_at)
        .await
        .expect("sweep");
    assert_eq!(report.purged, 1);
    assert!(app.recycle.list_quarantined(&ctx).await.expect("list").is_empty());
    assert!(
        !app.engine
            .quarantine_exists(ctx.user_id, &item.quarantine_path)
            .await
            .expect("exists")
    );
}

#[tokio::test]
async fn test_restore_next_to_a_newer_file_with_the_same_name() {
    let app = TestApp::new().await;
    let ctx = new_user();
    app.directories.create_directory(&ctx, "/", "work").await.expect("work");
    let first = app.upload(&ctx, "work", "plan.md", b"draft one").await;
    let item = app.files.delete_file(&ctx, first.file.id).await.expect("delete");

    // a new file now occupies the original logical name
    app.upload(&ctx, "work", "plan.md", b"draft two").await;

    let restored = app.recycle.restore(&ctx, item.id).await.expect("restore");
    assert_eq!(restored.path, "work/plan_restored1.md");
    let RestoredTarget::File(file) = restored.entry else {
        panic!("expected a file");
    };
    assert_eq!(app.read(&ctx, file.id).await, b"draft one");

    let listing = app.directories.list_directory(&ctx, "work").await.expect("list");
    let mut names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["plan.md", "plan_restored1.md"]);
}

#[tokio::test]
async fn test_users_are_isolated() {
    let app = TestApp::new().await;
    let alice = new_user();
    let bob = new_user();

    app.directories.create_directory(&alice, "/", "docs").await.expect("alice docs");
    app.directories.create_directory(&bob, "/", "docs").await.expect("bob docs");
    let secret = app.upload(&alice, "docs", "secret.txt", b"alice only").await;

    let listing = app.directories.list_directory(&bob, "docs").await.expect("list");
    assert!(listing.files.is_empty());
    assert!(listing.unindexed.is_empty());

    let err = app.files.open(&bob, secret.file.id).await.expect_err("foreign open");
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert!(
        !app.engine
            .user_root(bob.user_id)
            .join(&secret.file.storage_path)
            .exists()
    );
}

#[tokio::test]
async fn test_traversal_never_leaves_the_user_root() {
    let app = TestApp::new().await;
    let ctx = new_user();

    for (dir, name) in [
        ("../..", "x.txt"),
        ("/", "../../etc/passwd"),
        ("docs/../../..", "x.txt"),
        ("/", "..\\..\\boot.ini"),
    ] {
        let err = app
            .files
            .upload(&ctx, upload_request(dir, name, b"x"))
            .await
            .expect_err("traversal");
        assert_eq!(err.kind, ErrorKind::Validation, "{dir} / {name}");
    }

    let outside = std::fs::read_dir(app.dir.path())
        .expect("read temp root")
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .count();
    assert_eq!(outside, 0);
}
