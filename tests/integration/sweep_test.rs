//! The scheduled recycle sweep, driven through the job executor.

use std::sync::Arc;

use chrono::Duration;

use hcloud_service::RecycleService;
use hcloud_worker::{JobExecutor, RecycleSweepJob};

use crate::helpers::{TestApp, new_user};

#[tokio::test]
async fn test_sweep_job_purges_expired_items() {
    let app = TestApp::new().await;
    let ctx = new_user();

    // zero retention makes every quarantined item immediately purgeable
    let instant = Arc::new(RecycleService::new(
        app.repos.clone(),
        Arc::clone(&app.engine),
        Duration::zero(),
    ));
    let mut executor = JobExecutor::new();
    executor.register(Arc::new(RecycleSweepJob::new(Arc::clone(&instant))));

    let kept = app.upload(&ctx, "/", "kept.txt", b"k").await;
    let doomed = app.upload(&ctx, "/", "doomed.txt", b"d").await;
    let long_lived = app.files.delete_file(&ctx, kept.file.id).await.expect("delete kept");
    let short_lived = instant
        .quarantine_file(&ctx, doomed.file.id)
        .await
        .expect("quarantine doomed");

    let result = executor
        .execute(RecycleSweepJob::JOB_TYPE)
        .await
        .expect("sweep")
        .expect("summary");
    assert_eq!(result["purged"].as_u64(), Some(1));
    assert_eq!(result["failures"].as_u64(), Some(0));

    let remaining = app.recycle.list_quarantined(&ctx).await.expect("list");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, long_lived.id);
    assert!(
        !app.engine
            .quarantine_exists(ctx.user_id, &short_lived.quarantine_path)
            .await
            .expect("exists")
    );
}
