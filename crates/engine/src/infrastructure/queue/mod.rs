//! Durable job queue on SQLite
//!
//! Queues: `default` (email, subscriptions) and `game` (turn processing).

mod runner;
mod sqlite_queue;
mod types;

pub use runner::{JobRunner, PeriodicScheduler, RunnerConfig, Worker};
pub use sqlite_queue::{retry_backoff, SqliteJobQueue};
pub use types::{
    InsertOpts, JobArgs, JobError, JobId, JobRecord, JobState, QUEUE_DEFAULT, QUEUE_GAME,
};
