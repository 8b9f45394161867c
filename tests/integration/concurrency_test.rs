//! Racing writers against the same logical names.

use std::sync::Arc;

use hcloud_core::ErrorKind;

use crate::helpers::{TestApp, new_user, upload_request};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_directory_has_one_winner() {
    let app = Arc::new(TestApp::new().await);
    let ctx = new_user();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = Arc::clone(&app);
            let ctx = ctx.clone();
            tokio::spawn(async move { app.directories.create_directory(&ctx, "/", "photos").await })
        })
        .collect();

    let mut created = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(dir) => created.push(dir),
            Err(err) => {
                assert_eq!(err.kind, ErrorKind::Conflict, "unexpected error: {err}");
                conflicts += 1;
            }
        }
    }
    assert_eq!(created.len(), 1);
    assert_eq!(conflicts, 7);
    assert_eq!(created[0].path, "photos");

    let listing = app.directories.list_directory(&ctx, "/").await.expect("list");
    assert_eq!(listing.directories.len(), 1);
    assert!(listing.unindexed.is_empty(), "losers left {:?}", listing.unindexed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_of_one_name() {
    let app = Arc::new(TestApp::new().await);
    let ctx = new_user();

    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let app = Arc::clone(&app);
            let ctx = ctx.clone();
            tokio::spawn(async move {
                app.files
                    .upload(&ctx, upload_request("/", "same.txt", &[b'a' + i; 32]))
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => winners += 1,
            Err(err) => assert_eq!(err.kind, ErrorKind::Conflict),
        }
    }
    assert_eq!(winners, 1);

    let listing = app.directories.list_directory(&ctx, "/").await.expect("list");
    assert_eq!(listing.files.len(), 1);
    assert!(listing.unindexed.is_empty(), "losers left {:?}", listing.unindexed);
}
