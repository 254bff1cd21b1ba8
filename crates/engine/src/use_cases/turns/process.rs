//! The `game_turn_processing` unit of work.

use std::sync::Arc;

use sqlx::SqlitePool;

use playbymail_domain::{GameInstanceId, GameType};

use super::error::TurnProcessingError;
use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::ClockPort;
use crate::infrastructure::queue::JobId;
use crate::queue_types::{GameTurnProcessing, SendTurnSheetNotificationEmail};
use crate::use_cases::adventure::{AdventureGame, ResponseSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnOutcome {
    pub game_instance_id: GameInstanceId,
    pub processed_turn: i32,
    pub next_turn: i32,
    pub responses: ResponseSummary,
    pub sheets_created: usize,
    pub notifications_queued: usize,
}

/// Advance one game instance by one turn.
///
/// Everything happens in one transaction: the status change, every character's
/// state changes, the next sheets, the notification jobs and the completion of
/// the job itself. Any failure rolls all of it back.
pub struct ProcessGameTurn {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
    adventure: Arc<AdventureGame>,
}

impl ProcessGameTurn {
    pub fn new(pool: SqlitePool, clock: Arc<dyn ClockPort>, adventure: Arc<AdventureGame>) -> Self {
        Self {
            pool,
            clock,
            adventure,
        }
    }

    /// `job_id` is completed inside the turn's transaction when given.
    pub async fn execute(
        &self,
        args: &GameTurnProcessing,
        job_id: Option<JobId>,
    ) -> Result<TurnOutcome, TurnProcessingError> {
        let mut model = Model::begin(&self.pool, Arc::clone(&self.clock)).await?;

        let mut instance = model.lock_game_instance(args.game_instance_id).await?;
        if instance.current_turn() != args.turn_number {
            return Err(TurnProcessingError::TurnNumberMismatch {
                game_instance_id: instance.id(),
                job_turn: args.turn_number,
                current_turn: instance.current_turn(),
            });
        }

        instance.begin_turn_processing(model.now())?;
        model.update_game_instance(&instance).await?;
        let processed_turn = instance.current_turn();
        tracing::info!(
            game_instance_id = %instance.id(),
            turn_number = processed_turn,
            "Turn processing started"
        );

        let game = model.get_game(instance.game_id()).await?;
        let game_type = game.kind()?;

        let responses = match game_type {
            GameType::Adventure => self.adventure.process_responses(&mut model, &instance).await?,
        };

        instance.complete_turn(model.now())?;
        model.update_game_instance(&instance).await?;

        let sheets = match game_type {
            GameType::Adventure => {
                self.adventure
                    .create_next_sheets(&mut model, &game, &instance)
                    .await?
            }
        };

        let mut notifications_queued = 0;
        for subscription in model.list_active_player_subscriptions(instance.id()).await? {
            let queued = model
                .insert_job(&SendTurnSheetNotificationEmail {
                    game_subscription_id: subscription.id,
                    game_instance_id: instance.id(),
                    turn_number: instance.current_turn(),
                })
                .await?;
            if queued.is_some() {
                notifications_queued += 1;
            }
        }

        if let Some(job_id) = job_id {
            model.complete_job(job_id).await?;
        }
        model.commit().await?;

        let outcome = TurnOutcome {
            game_instance_id: instance.id(),
            processed_turn,
            next_turn: instance.current_turn(),
            responses,
            sheets_created: sheets.len(),
            notifications_queued,
        };
        tracing::info!(
            game_instance_id = %outcome.game_instance_id,
            processed_turn = outcome.processed_turn,
            next_turn = outcome.next_turn,
            sheets_processed = outcome.responses.sheets_processed,
            sheets_created = outcome.sheets_created,
            notifications = outcome.notifications_queued,
            "Turn processed"
        );
        Ok(outcome)
    }
}
