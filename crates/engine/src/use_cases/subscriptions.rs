//! The `process_subscription` unit of work.

use std::sync::Arc;

use sqlx::SqlitePool;

use playbymail_domain::{
    CharacterInstanceId, DomainError, GameId, GameInstance, GameInstanceId, GameInstanceStatus,
    GameSubscription, GameSubscriptionId, GameType, SubscriptionStatus,
};

use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::{ClockPort, QueueError, RepoError};
use crate::infrastructure::queue::{JobError, JobId};
use crate::queue_types::SendTurnSheetNotificationEmail;
use crate::use_cases::adventure::{initialize_world, join_character, AdventureGame};
use crate::use_cases::turns::TurnProcessingError;

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Game instance {0} is processing a turn")]
    InstanceBusy(GameInstanceId),
    #[error("Game instance {0} has ended")]
    InstanceEnded(GameInstanceId),
    #[error("Game {0} has no instance open for players")]
    NoOpenInstance(GameId),
    #[error("Account already has active player subscription {0} for this game")]
    DuplicatePlayer(GameSubscriptionId),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Turn sheet generation failed: {0}")]
    Turn(#[from] TurnProcessingError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl From<SubscriptionError> for JobError {
    fn from(error: SubscriptionError) -> Self {
        match error {
            SubscriptionError::InstanceBusy(_) | SubscriptionError::NoOpenInstance(_) => {
                JobError::retryable(error.to_string())
            }
            SubscriptionError::Turn(e) => e.into(),
            SubscriptionError::Repo(ref e) if !e.is_not_found() => {
                JobError::retryable(error.to_string())
            }
            SubscriptionError::Queue(_) => JobError::retryable(error.to_string()),
            _ => JobError::permanent(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// Revoked before the job ran.
    Skipped,
    /// Non-player subscription; nothing to place.
    Activated,
    Joined {
        game_instance_id: GameInstanceId,
        character_instance_id: CharacterInstanceId,
        sheets_created: usize,
    },
}

/// Activate a subscription and, for players, put their character into the game.
pub struct ProcessSubscriptionUseCase {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
    adventure: Arc<AdventureGame>,
}

impl ProcessSubscriptionUseCase {
    pub fn new(pool: SqlitePool, clock: Arc<dyn ClockPort>, adventure: Arc<AdventureGame>) -> Self {
        Self {
            pool,
            clock,
            adventure,
        }
    }

    pub async fn execute(
        &self,
        subscription_id: GameSubscriptionId,
        job_id: Option<JobId>,
    ) -> Result<SubscriptionOutcome, SubscriptionError> {
        let mut model = Model::begin(&self.pool, Arc::clone(&self.clock)).await?;
        let mut subscription = model.get_subscription(subscription_id).await?;

        let outcome = if subscription.status == SubscriptionStatus::Revoked {
            tracing::info!(game_subscription_id = %subscription.id, "Subscription revoked, skipping");
            SubscriptionOutcome::Skipped
        } else if !subscription.is_player() {
            subscription.activate(None, model.now())?;
            model.update_subscription(&subscription).await?;
            SubscriptionOutcome::Activated
        } else {
            self.place_player(&mut model, &mut subscription).await?
        };

        if let Some(job_id) = job_id {
            model.complete_job(job_id).await?;
        }
        model.commit().await?;

        tracing::info!(
            game_subscription_id = %subscription.id,
            subscription_type = %subscription.subscription_type,
            outcome = ?outcome,
            "Subscription processed"
        );
        Ok(outcome)
    }

    async fn place_player(
        &self,
        model: &mut Model,
        subscription: &mut GameSubscription,
    ) -> Result<SubscriptionOutcome, SubscriptionError> {
        let mut instance = self.target_instance(model, subscription).await?;
        if instance.status() == GameInstanceStatus::Processing {
            return Err(SubscriptionError::InstanceBusy(instance.id()));
        }
        if instance.status().is_terminal() {
            return Err(SubscriptionError::InstanceEnded(instance.id()));
        }

        if let Some(existing) = model
            .find_active_player_subscription(subscription.game_id, subscription.account_id)
            .await?
        {
            if existing.id != subscription.id {
                return Err(SubscriptionError::DuplicatePlayer(existing.id));
            }
        }

        let now = model.now();
        subscription.activate(Some(instance.id()), now)?;
        model.update_subscription(subscription).await?;

        if instance.status() == GameInstanceStatus::Created {
            initialize_world(model, &instance).await?;
            instance.start(now)?;
            model.update_game_instance(&instance).await?;
        }

        let game = model.get_game(instance.game_id()).await?;
        let account = model.get_account(subscription.account_id).await?;
        let joined = join_character(model, &instance, &account).await?;

        let sheets = match game.kind()? {
            GameType::Adventure => {
                self.adventure
                    .create_character_sheets(model, &game, &instance, &joined.instance)
                    .await?
            }
        };
        if !sheets.is_empty() {
            model
                .insert_job(&SendTurnSheetNotificationEmail {
                    game_subscription_id: subscription.id,
                    game_instance_id: instance.id(),
                    turn_number: instance.current_turn(),
                })
                .await?;
        }

        Ok(SubscriptionOutcome::Joined {
            game_instance_id: instance.id(),
            character_instance_id: joined.instance.id,
            sheets_created: sheets.len(),
        })
    }

    async fn target_instance(
        &self,
        model: &mut Model,
        subscription: &GameSubscription,
    ) -> Result<GameInstance, SubscriptionError> {
        let id = match subscription.game_instance_id {
            Some(id) => id,
            None => model
                .find_joinable_game_instance(subscription.game_id)
                .await?
                .map(|instance| instance.id())
                .ok_or(SubscriptionError::NoOpenInstance(subscription.game_id))?,
        };
        Ok(model.lock_game_instance(id).await?)
    }
}
