//! Job runner and periodic scheduler.
//!
//! A [`JobRunner`] polls one queue with N concurrent loops and dispatches each
//! leased job by `kind` to a registered [`Worker`]. Every run is bounded by the
//! job timeout and the shutdown token; either firing drops the worker's future,
//! which rolls back its transaction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::infrastructure::ports::QueueError;

use super::sqlite_queue::SqliteJobQueue;
use super::types::{JobArgs, JobError, JobRecord, JobState};

#[async_trait]
pub trait Worker: Send + Sync {
    /// The `JobArgs::KIND` this worker handles.
    fn kind(&self) -> &'static str;

    /// Workers that complete their job inside their own transaction return `Ok`
    /// after committing; the runner's completion is then a no-op.
    async fn work(&self, job: &JobRecord) -> Result<(), JobError>;
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub queue: &'static str,
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub job_timeout: Duration,
}

impl RunnerConfig {
    pub fn new(queue: &'static str) -> Self {
        Self {
            queue,
            concurrency: 2,
            poll_interval: Duration::from_millis(500),
            job_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

pub struct JobRunner {
    queue: Arc<SqliteJobQueue>,
    workers: HashMap<&'static str, Arc<dyn Worker>>,
    config: RunnerConfig,
    shutdown: CancellationToken,
}

impl JobRunner {
    pub fn new(queue: Arc<SqliteJobQueue>, config: RunnerConfig, shutdown: CancellationToken) -> Self {
        Self {
            queue,
            workers: HashMap::new(),
            config,
            shutdown,
        }
    }

    pub fn register(mut self, worker: Arc<dyn Worker>) -> Self {
        self.workers.insert(worker.kind(), worker);
        self
    }

    /// Start the polling loops. They exit when the shutdown token is cancelled.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let runner = Arc::new(self);
        (0..runner.config.concurrency)
            .map(|slot| {
                let runner = Arc::clone(&runner);
                tokio::spawn(async move { runner.poll_loop(slot).await })
            })
            .collect()
    }

    async fn poll_loop(&self, slot: usize) {
        tracing::info!(queue = self.config.queue, slot, "Job runner started");
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            let worked = match self.run_once().await {
                Ok(worked) => worked,
                Err(e) => {
                    tracing::warn!(queue = self.config.queue, error = %e, "Failed to poll job queue");
                    false
                }
            };
            if !worked {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }
        tracing::info!(queue = self.config.queue, slot, "Job runner stopped");
    }

    /// Lease and run one job. Returns false when the queue had nothing due.
    pub async fn run_once(&self) -> Result<bool, QueueError> {
        let Some(job) = self.queue.fetch(self.config.queue).await? else {
            return Ok(false);
        };
        self.execute(job).await?;
        Ok(true)
    }

    async fn execute(&self, job: JobRecord) -> Result<(), QueueError> {
        let span = tracing::info_span!(
            "job",
            job_id = %job.id,
            kind = %job.kind,
            attempt = job.attempt
        );
        self.dispatch(job).instrument(span).await
    }

    async fn dispatch(&self, job: JobRecord) -> Result<(), QueueError> {
        let Some(worker) = self.workers.get(job.kind.as_str()) else {
            tracing::error!("No worker registered for job kind");
            return self
                .queue
                .cancel(job.id, &format!("no worker for kind {}", job.kind))
                .await;
        };

        let outcome = tokio::select! {
            _ = self.shutdown.cancelled() => Err(JobError::retryable("cancelled by shutdown")),
            result = tokio::time::timeout(self.config.job_timeout, worker.work(&job)) => {
                result.unwrap_or_else(|_| {
                    Err(JobError::retryable(format!(
                        "job timed out after {:?}",
                        self.config.job_timeout
                    )))
                })
            }
        };

        match outcome {
            Ok(()) => {
                self.queue.complete(job.id).await?;
                tracing::info!("Job completed");
            }
            Err(JobError::Permanent(message)) => {
                tracing::warn!(error = %message, "Job failed permanently");
                self.queue.cancel(job.id, &message).await?;
            }
            Err(JobError::Retryable(message)) => {
                let state = self.queue.fail(&job, &message).await?;
                if state == JobState::Discarded {
                    tracing::error!(error = %message, "Job failed and has no attempts left");
                } else {
                    tracing::warn!(error = %message, "Job failed, will retry");
                }
            }
        }
        Ok(())
    }
}

/// How long finished jobs are kept before the scheduler deletes them.
pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Inserts one periodic job on a fixed cadence, rescues stuck jobs and
/// deletes old finished ones.
pub struct PeriodicScheduler {
    queue: Arc<SqliteJobQueue>,
    interval: Duration,
    rescue_after: Duration,
    retention: Duration,
    shutdown: CancellationToken,
}

impl PeriodicScheduler {
    pub fn new(
        queue: Arc<SqliteJobQueue>,
        interval: Duration,
        rescue_after: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            interval,
            rescue_after,
            retention: DEFAULT_JOB_RETENTION,
            shutdown,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn spawn<A>(self) -> JoinHandle<()>
    where
        A: JobArgs + Default + 'static,
    {
        tokio::spawn(async move {
            tracing::info!(kind = A::KIND, interval_secs = self.interval.as_secs(), "Periodic scheduler started");
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                self.tick::<A>().await;
            }
            tracing::info!(kind = A::KIND, "Periodic scheduler stopped");
        })
    }

    async fn tick<A: JobArgs + Default>(&self) {
        if let Err(e) = self.queue.insert(&A::default()).await {
            tracing::error!(kind = A::KIND, error = %e, "Failed to insert periodic job");
        }
        let rescue_after = chrono::Duration::from_std(self.rescue_after)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        if let Err(e) = self.queue.rescue_stuck(rescue_after).await {
            tracing::warn!(error = %e, "Failed to rescue stuck jobs");
        }
        let retention = chrono::Duration::from_std(self.retention)
            .unwrap_or_else(|_| chrono::Duration::days(7));
        if let Err(e) = self.queue.cleanup(retention).await {
            tracing::warn!(error = %e, "Failed to clean up finished jobs");
        }
    }
}
