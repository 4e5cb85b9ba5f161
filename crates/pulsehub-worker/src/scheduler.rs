//! Interval scheduler for periodic maintenance tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use pulsehub_core::config::AppConfig;
use pulsehub_core::error::AppError;

use crate::executor::JobExecutor;

/// Runs registered jobs on fixed intervals
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Executor the scheduled ticks dispatch into
    executor: Arc<JobExecutor>,
    /// Job types registered so far
    registered: Vec<String>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("registered", &self.registered)
            .finish()
    }
}

impl CronScheduler {
    /// Create a new scheduler
    pub async fn new(executor: Arc<JobExecutor>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            executor,
            registered: Vec::new(),
        })
    }

    /// Register the built-in maintenance tasks on their configured intervals
    pub async fn register_default_tasks(&mut self, config: &AppConfig) -> Result<(), AppError> {
        self.register_repeated(
            "presence_eviction",
            Duration::from_secs(config.presence.eviction_interval_seconds),
        )
        .await?;
        self.register_repeated(
            "session_cleanup",
            Duration::from_secs(config.session.cleanup_interval_seconds),
        )
        .await?;
        self.register_repeated(
            "risk_scan",
            Duration::from_secs(config.session.risk_scan_interval_seconds),
        )
        .await?;

        tracing::info!(tasks = self.registered.len(), "All scheduled tasks registered");
        Ok(())
    }

    /// Run `job_type` every `every`. The executor must hold a handler for it.
    pub async fn register_repeated(
        &mut self,
        job_type: &str,
        every: Duration,
    ) -> Result<(), AppError> {
        if !self.executor.has_handler(job_type) {
            return Err(AppError::configuration(format!(
                "No handler registered for scheduled job '{job_type}'"
            )));
        }
        if every.is_zero() {
            return Err(AppError::configuration(format!(
                "Interval for scheduled job '{job_type}' must be positive"
            )));
        }

        let executor = Arc::clone(&self.executor);
        let name = job_type.to_string();
        let job = CronJob::new_repeated_async(every, move |_uuid, _lock| {
            let executor = Arc::clone(&executor);
            let name = name.clone();
            Box::pin(async move {
                executor.run(&name).await;
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create {job_type} schedule: {e}"))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add {job_type} schedule: {e}"))
        })?;

        self.registered.push(job_type.to_string());
        tracing::info!(job_type = %job_type, every_seconds = every.as_secs(), "Registered scheduled task");
        Ok(())
    }

    /// Job types registered so far, in registration order
    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Scheduler shut down");
        Ok(())
    }
}
