//! SQLite job queue.
//!
//! Jobs live in the `job` table next to the game state. Statements are written
//! against a bare connection so the same code serves the pool (runner side)
//! and a [`Model`] transaction (worker side).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{SqliteConnection, SqlitePool};

use crate::infrastructure::persistence::{rows, Model};
use crate::infrastructure::ports::{ClockPort, QueueError, RepoError};

use super::types::{InsertOpts, JobArgs, JobId, JobRecord, JobState};

const COLUMNS: &str = "id, kind, queue, args, state, attempt, max_attempts, priority, \
     scheduled_at, attempted_at, last_error, created_at";

/// Longest wait between retries of a failed job.
const MAX_BACKOFF_SECS: i64 = 60 * 60;

fn row_to_job(row: &SqliteRow) -> Result<JobRecord, QueueError> {
    let state: String = rows::text(row, "state")?;
    Ok(JobRecord {
        id: JobId(rows::int(row, "id")?),
        kind: rows::text(row, "kind")?,
        queue: rows::text(row, "queue")?,
        args: rows::json(row, "args")?,
        state: state.parse()?,
        attempt: rows::int32(row, "attempt")?,
        max_attempts: rows::int32(row, "max_attempts")?,
        priority: rows::int32(row, "priority")?,
        scheduled_at: rows::ts(row, "scheduled_at")?,
        attempted_at: rows::opt_ts(row, "attempted_at")?,
        last_error: rows::opt_text(row, "last_error")?,
        created_at: rows::ts(row, "created_at")?,
    })
}

/// Delay before the next run of a job that just failed its `attempt`-th run.
pub fn retry_backoff(attempt: i32) -> Duration {
    let exponent = u32::try_from(attempt.clamp(1, 20)).unwrap_or(1);
    let secs = 2i64.saturating_pow(exponent).min(MAX_BACKOFF_SECS);
    Duration::seconds(secs)
}

// =============================================================================
// Statements
// =============================================================================

async fn insert_job(
    conn: &mut SqliteConnection,
    kind: &str,
    args: &str,
    opts: &InsertOpts,
    queue: &str,
    now: DateTime<Utc>,
) -> Result<Option<JobId>, QueueError> {
    if opts.unique {
        let existing: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM job
            WHERE kind = ? AND args = ? AND state IN ('available', 'running', 'retryable')
            LIMIT 1
            "#,
        )
        .bind(kind)
        .bind(args)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::database("insert_job", e))?;
        if let Some(id) = existing {
            tracing::debug!(kind, job_id = id, "Skipping duplicate unique job");
            return Ok(None);
        }
    }

    let scheduled_at = opts.scheduled_at.unwrap_or(now);
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO job (kind, queue, args, state, attempt, max_attempts, priority, scheduled_at, created_at)
        VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(kind)
    .bind(queue)
    .bind(args)
    .bind(JobState::Available.as_str())
    .bind(opts.max_attempts)
    .bind(opts.priority)
    .bind(rows::format_ts(scheduled_at))
    .bind(rows::format_ts(now))
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepoError::database("insert_job", e))?;

    tracing::debug!(kind, queue, job_id = id, "Job inserted");
    Ok(Some(JobId(id)))
}

async fn insert_args<A: JobArgs>(
    conn: &mut SqliteConnection,
    args: &A,
    opts: &InsertOpts,
    now: DateTime<Utc>,
) -> Result<Option<JobId>, QueueError> {
    let encoded =
        serde_json::to_string(args).map_err(|e| QueueError::Serialization(e.to_string()))?;
    let queue = opts.queue.unwrap_or_else(A::queue);
    insert_job(conn, A::KIND, &encoded, opts, queue, now).await
}

async fn complete_job(
    conn: &mut SqliteConnection,
    id: JobId,
    now: DateTime<Utc>,
) -> Result<bool, QueueError> {
    let result = sqlx::query(
        "UPDATE job SET state = ?, finalized_at = ? WHERE id = ? AND state = ?",
    )
    .bind(JobState::Completed.as_str())
    .bind(rows::format_ts(now))
    .bind(id.0)
    .bind(JobState::Running.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::database("complete_job", e))?;
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Inside a unit of work
// =============================================================================

impl Model {
    /// Insert a job that becomes visible only if this unit of work commits.
    pub async fn insert_job<A: JobArgs>(&mut self, args: &A) -> Result<Option<JobId>, QueueError> {
        self.insert_job_with(args, A::insert_opts()).await
    }

    pub async fn insert_job_with<A: JobArgs>(
        &mut self,
        args: &A,
        opts: InsertOpts,
    ) -> Result<Option<JobId>, QueueError> {
        let now = self.now();
        insert_args(self.conn(), args, &opts, now).await
    }

    /// Mark the running job done as part of this unit of work.
    pub async fn complete_job(&mut self, id: JobId) -> Result<bool, QueueError> {
        let now = self.now();
        complete_job(self.conn(), id, now).await
    }
}

// =============================================================================
// Runner side
// =============================================================================

pub struct SqliteJobQueue {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteJobQueue {
    pub fn new(pool: SqlitePool, clock: Arc<dyn ClockPort>) -> Self {
        Self { pool, clock }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn clock(&self) -> Arc<dyn ClockPort> {
        Arc::clone(&self.clock)
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<sqlx::Sqlite>, QueueError> {
        Ok(self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::database("acquire", e))?)
    }

    pub async fn insert<A: JobArgs>(&self, args: &A) -> Result<Option<JobId>, QueueError> {
        self.insert_with(args, A::insert_opts()).await
    }

    pub async fn insert_with<A: JobArgs>(
        &self,
        args: &A,
        opts: InsertOpts,
    ) -> Result<Option<JobId>, QueueError> {
        let mut conn = self.acquire().await?;
        insert_args(&mut conn, args, &opts, self.clock.now()).await
    }

    /// Lease the next due job on `queue`, counting the attempt.
    pub async fn fetch(&self, queue: &str) -> Result<Option<JobRecord>, QueueError> {
        let now = rows::format_ts(self.clock.now());
        let sql = format!(
            "UPDATE job SET state = 'running', attempt = attempt + 1, attempted_at = ? \
             WHERE id = ( \
                 SELECT id FROM job \
                 WHERE queue = ? AND state IN ('available', 'retryable') AND scheduled_at <= ? \
                 ORDER BY priority, scheduled_at, id LIMIT 1 \
             ) \
             RETURNING {}",
            COLUMNS
        );
        let mut conn = self.acquire().await?;
        let row = sqlx::query(&sql)
            .bind(&now)
            .bind(queue)
            .bind(&now)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| RepoError::database("fetch_job", e))?;
        row.as_ref().map(row_to_job).transpose()
    }

    /// Returns false when the job was already finalized (e.g. by the worker's own commit).
    pub async fn complete(&self, id: JobId) -> Result<bool, QueueError> {
        let mut conn = self.acquire().await?;
        complete_job(&mut conn, id, self.clock.now()).await
    }

    /// Record a retryable failure. The job runs again after backoff, or is
    /// discarded once it has used all its attempts.
    pub async fn fail(&self, job: &JobRecord, error: &str) -> Result<JobState, QueueError> {
        let now = self.clock.now();
        let (state, scheduled_at, finalized_at) = if job.attempt >= job.max_attempts {
            (JobState::Discarded, job.scheduled_at, Some(now))
        } else {
            (JobState::Retryable, now + retry_backoff(job.attempt), None)
        };

        let mut conn = self.acquire().await?;
        sqlx::query(
            r#"
            UPDATE job SET state = ?, scheduled_at = ?, finalized_at = ?, last_error = ?
            WHERE id = ? AND state = 'running'
            "#,
        )
        .bind(state.as_str())
        .bind(rows::format_ts(scheduled_at))
        .bind(rows::format_opt_ts(finalized_at))
        .bind(error)
        .bind(job.id.0)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::database("fail_job", e))?;
        Ok(state)
    }

    /// Finalize a job that must never run again.
    pub async fn cancel(&self, id: JobId, error: &str) -> Result<(), QueueError> {
        let mut conn = self.acquire().await?;
        sqlx::query(
            r#"
            UPDATE job SET state = ?, finalized_at = ?, last_error = ?
            WHERE id = ? AND state NOT IN ('completed', 'cancelled', 'discarded')
            "#,
        )
        .bind(JobState::Cancelled.as_str())
        .bind(rows::format_ts(self.clock.now()))
        .bind(error)
        .bind(id.0)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::database("cancel_job", e))?;
        Ok(())
    }

    /// Put back jobs whose worker disappeared mid-run.
    pub async fn rescue_stuck(&self, older_than: Duration) -> Result<u64, QueueError> {
        let now = self.clock.now();
        let mut conn = self.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE job SET state = 'retryable', scheduled_at = ?, last_error = 'rescued after lease expired'
            WHERE state = 'running' AND attempted_at < ?
            "#,
        )
        .bind(rows::format_ts(now))
        .bind(rows::format_ts(now - older_than))
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::database("rescue_stuck_jobs", e))?;
        if result.rows_affected() > 0 {
            tracing::warn!(count = result.rows_affected(), "Rescued stuck jobs");
        }
        Ok(result.rows_affected())
    }

    /// Delete finished jobs whose final state is older than `older_than`.
    pub async fn cleanup(&self, older_than: Duration) -> Result<u64, QueueError> {
        let Some(cutoff) = self.clock.now().checked_sub_signed(older_than) else {
            return Ok(0);
        };
        let mut conn = self.acquire().await?;
        let result = sqlx::query(
            r#"
            DELETE FROM job
            WHERE state IN ('completed', 'cancelled', 'discarded') AND finalized_at < ?
            "#,
        )
        .bind(rows::format_ts(cutoff))
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::database("cleanup_jobs", e))?;
        if result.rows_affected() > 0 {
            tracing::info!(count = result.rows_affected(), "Deleted finished jobs");
        }
        Ok(result.rows_affected())
    }

    pub async fn get(&self, id: JobId) -> Result<JobRecord, QueueError> {
        let sql = format!("SELECT {} FROM job WHERE id = ?", COLUMNS);
        let mut conn = self.acquire().await?;
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| RepoError::database("get_job", e))?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        row_to_job(&row)
    }

    pub async fn list_by_kind(&self, kind: &str) -> Result<Vec<JobRecord>, QueueError> {
        let sql = format!("SELECT {} FROM job WHERE kind = ? ORDER BY id", COLUMNS);
        let mut conn = self.acquire().await?;
        let rows = sqlx::query(&sql)
            .bind(kind)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| RepoError::database("list_jobs", e))?;
        rows.iter().map(row_to_job).collect()
    }
}
