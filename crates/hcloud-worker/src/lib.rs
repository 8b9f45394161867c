//! Background work for H-Cloud.
//!
//! This crate provides:
//! - A job executor that dispatches work to registered handlers
//! - A cron scheduler that runs handlers on their configured schedules
//! - The recycle bin sweep that purges expired quarantined entries

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use jobs::RecycleSweepJob;
pub use scheduler::CronScheduler;
