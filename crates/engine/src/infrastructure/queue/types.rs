//! Core job types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::infrastructure::ports::QueueError;

pub const QUEUE_DEFAULT: &str = "default";
pub const QUEUE_GAME: &str = "game";

/// Row id of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Waiting for its scheduled time.
    Available,
    /// Leased by a worker.
    Running,
    /// Failed, will run again after backoff.
    Retryable,
    Completed,
    /// Failed permanently; never retried.
    Cancelled,
    /// Ran out of attempts.
    Discarded,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Available => "available",
            JobState::Running => "running",
            JobState::Retryable => "retryable",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
            JobState::Discarded => "discarded",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Discarded
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(JobState::Available),
            "running" => Ok(JobState::Running),
            "retryable" => Ok(JobState::Retryable),
            "completed" => Ok(JobState::Completed),
            "cancelled" => Ok(JobState::Cancelled),
            "discarded" => Ok(JobState::Discarded),
            other => Err(QueueError::Serialization(format!("unknown job state: {}", other))),
        }
    }
}

/// Per-insert options. Defaults come from [`JobArgs::insert_opts`].
#[derive(Debug, Clone)]
pub struct InsertOpts {
    pub queue: Option<&'static str>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub max_attempts: i32,
    /// Lower runs first.
    pub priority: i32,
    /// Skip the insert while an unfinished job with the same kind and args exists.
    pub unique: bool,
}

impl Default for InsertOpts {
    fn default() -> Self {
        Self {
            queue: None,
            scheduled_at: None,
            max_attempts: 25,
            priority: 1,
            unique: false,
        }
    }
}

/// A job payload type. The kind string routes the job to its worker.
pub trait JobArgs: Serialize + DeserializeOwned + Send + Sync {
    const KIND: &'static str;

    fn queue() -> &'static str {
        QUEUE_DEFAULT
    }

    fn insert_opts() -> InsertOpts {
        InsertOpts::default()
    }
}

/// A leased job as handed to a worker.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: String,
    pub queue: String,
    pub args: serde_json::Value,
    pub state: JobState,
    /// 1 on the first run.
    pub attempt: i32,
    pub max_attempts: i32,
    pub priority: i32,
    pub scheduled_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn decode<A: JobArgs>(&self) -> Result<A, JobError> {
        serde_json::from_value(self.args.clone()).map_err(|e| {
            JobError::permanent(format!("invalid {} args: {}", A::KIND, e))
        })
    }
}

/// How a worker tells the runner what to do with a failed job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// Never retry (stale duplicate, unknown game type, bad payload...).
    #[error("{0}")]
    Permanent(String),
    /// Try again after backoff, until attempts run out.
    #[error("{0}")]
    Retryable(String),
}

impl JobError {
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable(message.into())
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
}
