//! Periodic purge of expired recycle bin items.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};

use hcloud_service::RecycleService;

use crate::executor::{JobExecutionError, JobHandler};

/// Purges every quarantined entry whose retention has run out.
#[derive(Debug)]
pub struct RecycleSweepJob {
    recycle: Arc<RecycleService>,
}

impl RecycleSweepJob {
    /// Job type under which the sweep is registered.
    pub const JOB_TYPE: &'static str = "recycle_sweep";

    /// Create a sweep over the given recycle service.
    pub fn new(recycle: Arc<RecycleService>) -> Self {
        Self { recycle }
    }
}

#[async_trait]
impl JobHandler for RecycleSweepJob {
    fn job_type(&self) -> &str {
        Self::JOB_TYPE
    }

    async fn execute(&self) -> Result<Option<Value>, JobExecutionError> {
        let report = self.recycle.purge_expired().await.map_err(|e| {
            error!(error = %e, "Recycle sweep failed");
            JobExecutionError::Transient(format!("Recycle sweep failed: {e}"))
        })?;

        for failure in &report.failures {
            warn!(item_id = %failure.item_id, error = %failure.error, "Sweep left content behind");
        }
        info!(
            scanned = report.scanned,
            purged = report.purged,
            failures = report.failures.len(),
            "Recycle sweep finished"
        );

        Ok(Some(serde_json::json!({
            "task": Self::JOB_TYPE,
            "scanned": report.scanned,
            "purged": report.purged,
            "failures": report.failures.len(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hcloud_core::config::StorageConfig;
    use hcloud_core::types::UserId;
    use hcloud_database::{MemoryDatabase, Repositories};
    use hcloud_service::{DirectoryService, RequestContext};
    use hcloud_storage::StorageEngine;

    #[tokio::test]
    async fn test_sweep_purges_expired_items() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = Arc::new(
            StorageEngine::new(&StorageConfig::under(dir.path()))
                .await
                .expect("engine"),
        );
        let repos = Repositories::memory(MemoryDatabase::new());
        // zero retention: items are purgeable as soon as they are quarantined
        let recycle = Arc::new(RecycleService::new(
            repos.clone(),
            Arc::clone(&engine),
            Duration::zero(),
        ));
        let directories = DirectoryService::new(repos, Arc::clone(&engine), Arc::clone(&recycle));

        let ctx = RequestContext::user(UserId::new());
        let old = directories.create_directory(&ctx, "/", "old").await.expect("dir");
        directories.delete_directory(&ctx, old.id).await.expect("delete");
        assert_eq!(recycle.list_quarantined(&ctx).await.expect("list").len(), 1);

        let summary = RecycleSweepJob::new(Arc::clone(&recycle))
            .execute()
            .await
            .expect("sweep")
            .expect("summary");
        assert_eq!(summary["purged"], 1);
        assert_eq!(summary["failures"], 0);
        assert!(recycle.list_quarantined(&ctx).await.expect("list").is_empty());
    }
}
