//! Cron scheduler for periodic maintenance.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, error, info};

use hcloud_core::config::RecycleConfig;
use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;

use crate::executor::JobExecutor;
use crate::jobs::RecycleSweepJob;

/// Runs registered job handlers on cron schedules.
pub struct CronScheduler {
    scheduler: JobScheduler,
    executor: Arc<JobExecutor>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl CronScheduler {
    /// Create a scheduler dispatching to `executor`.
    pub async fn new(executor: Arc<JobExecutor>) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;
        Ok(Self { scheduler, executor })
    }

    /// Register the default tasks according to configuration.
    pub async fn register_default_tasks(&self, recycle: &RecycleConfig) -> AppResult<()> {
        if recycle.sweep_enabled {
            self.register(&recycle.sweep_schedule, RecycleSweepJob::JOB_TYPE)
                .await?;
        } else {
            info!("Recycle sweep disabled by configuration");
        }
        Ok(())
    }

    /// Run the handler for `job_type` on a six-field cron `schedule`.
    pub async fn register(&self, schedule: &str, job_type: &str) -> AppResult<()> {
        if !self.executor.has_handler(job_type) {
            return Err(AppError::configuration(format!(
                "No handler registered for scheduled job '{job_type}'"
            )));
        }

        let executor = Arc::clone(&self.executor);
        let name = job_type.to_string();
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let executor = Arc::clone(&executor);
            let name = name.clone();
            Box::pin(async move {
                debug!(job_type = %name, "Scheduled job firing");
                match executor.execute(&name).await {
                    Ok(Some(summary)) => debug!(job_type = %name, summary = %summary, "Scheduled job done"),
                    Ok(None) => {}
                    Err(e) => error!(job_type = %name, error = %e, "Scheduled job failed"),
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid schedule '{schedule}' for {job_type}: {e}"))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add {job_type} schedule: {e}"))
        })?;

        info!(job_type = %job_type, schedule = %schedule, "Registered scheduled job");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;
        info!("Cron scheduler started");
        Ok(())
    }

    /// Shut the scheduler down.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shut down scheduler: {e}")))?;
        info!("Cron scheduler shut down");
        Ok(())
    }
}
