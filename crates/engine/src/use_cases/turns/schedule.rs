//! The periodic `queue_game_turn_processing` tick.

use std::sync::Arc;

use sqlx::SqlitePool;

use super::error::TurnProcessingError;
use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::ClockPort;
use crate::infrastructure::queue::JobId;
use crate::queue_types::GameTurnProcessing;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub due: usize,
    pub enqueued: usize,
    /// A job for the same instance and turn was still waiting.
    pub already_queued: usize,
    pub failed: usize,
}

/// Enqueue a turn job for every started instance whose deadline has passed.
///
/// The instance is not touched; the turn job moves it to `processing`.
pub struct ScheduleDueTurns {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl ScheduleDueTurns {
    pub fn new(pool: SqlitePool, clock: Arc<dyn ClockPort>) -> Self {
        Self { pool, clock }
    }

    pub async fn execute(&self, job_id: Option<JobId>) -> Result<ScheduleSummary, TurnProcessingError> {
        let mut model = Model::begin(&self.pool, Arc::clone(&self.clock)).await?;
        let due = model.list_due_game_instances().await?;
        let mut summary = ScheduleSummary {
            due: due.len(),
            ..Default::default()
        };

        for instance in &due {
            let args = GameTurnProcessing {
                game_instance_id: instance.id(),
                turn_number: instance.current_turn(),
            };
            match model.insert_job(&args).await {
                Ok(Some(job)) => {
                    tracing::debug!(
                        game_instance_id = %instance.id(),
                        turn_number = args.turn_number,
                        job_id = %job,
                        "Turn job enqueued"
                    );
                    summary.enqueued += 1;
                }
                Ok(None) => summary.already_queued += 1,
                Err(e) => {
                    tracing::error!(
                        game_instance_id = %instance.id(),
                        error = %e,
                        "Failed to enqueue turn job"
                    );
                    summary.failed += 1;
                }
            }
        }

        if let Some(job_id) = job_id {
            model.complete_job(job_id).await?;
        }
        model.commit().await?;

        if summary.due > 0 {
            tracing::info!(
                due = summary.due,
                enqueued = summary.enqueued,
                already_queued = summary.already_queued,
                failed = summary.failed,
                "Due turns scheduled"
            );
        }
        Ok(summary)
    }
}
