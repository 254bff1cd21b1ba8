//! Queue workers
//!
//! One [`Worker`] per job kind. Each decodes its payload, runs the matching use
//! case and maps the use case's error onto [`JobError`]. The game turn, the
//! scheduler tick and subscription processing complete their job inside their
//! own transaction; email sending is left to the runner's completion.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use crate::infrastructure::queue::{JobArgs, JobError, JobRecord, Worker};
use crate::queue_types::{
    GameTurnProcessing, ProcessSubscription, QueueGameTurnProcessing,
    SendTurnSheetNotificationEmail,
};
use crate::use_cases::notifications::SendTurnSheetNotification;
use crate::use_cases::subscriptions::ProcessSubscriptionUseCase;
use crate::use_cases::turns::{ProcessGameTurn, ScheduleDueTurns};

pub struct QueueGameTurnProcessingWorker {
    schedule: Arc<ScheduleDueTurns>,
}

impl QueueGameTurnProcessingWorker {
    pub fn new(schedule: Arc<ScheduleDueTurns>) -> Self {
        Self { schedule }
    }
}

#[async_trait]
impl Worker for QueueGameTurnProcessingWorker {
    fn kind(&self) -> &'static str {
        QueueGameTurnProcessing::KIND
    }

    async fn work(&self, job: &JobRecord) -> Result<(), JobError> {
        let _args: QueueGameTurnProcessing = job.decode()?;
        self.schedule.execute(Some(job.id)).await?;
        Ok(())
    }
}

pub struct GameTurnProcessingWorker {
    process: Arc<ProcessGameTurn>,
}

impl GameTurnProcessingWorker {
    pub fn new(process: Arc<ProcessGameTurn>) -> Self {
        Self { process }
    }
}

#[async_trait]
impl Worker for GameTurnProcessingWorker {
    fn kind(&self) -> &'static str {
        GameTurnProcessing::KIND
    }

    async fn work(&self, job: &JobRecord) -> Result<(), JobError> {
        let args: GameTurnProcessing = job.decode()?;
        let span = tracing::info_span!(
            "game_turn",
            game_instance_id = %args.game_instance_id,
            turn_number = args.turn_number
        );
        self.process
            .execute(&args, Some(job.id))
            .instrument(span)
            .await
            .map(|_| ())
            .map_err(|e| {
                tracing::warn!(
                    game_instance_id = %args.game_instance_id,
                    turn_number = args.turn_number,
                    error = %e,
                    "Turn processing failed"
                );
                e.into()
            })
    }
}

pub struct SendTurnSheetNotificationEmailWorker {
    send: Arc<SendTurnSheetNotification>,
}

impl SendTurnSheetNotificationEmailWorker {
    pub fn new(send: Arc<SendTurnSheetNotification>) -> Self {
        Self { send }
    }
}

#[async_trait]
impl Worker for SendTurnSheetNotificationEmailWorker {
    fn kind(&self) -> &'static str {
        SendTurnSheetNotificationEmail::KIND
    }

    async fn work(&self, job: &JobRecord) -> Result<(), JobError> {
        let args: SendTurnSheetNotificationEmail = job.decode()?;
        self.send.execute(&args).await?;
        Ok(())
    }
}

pub struct ProcessSubscriptionWorker {
    process: Arc<ProcessSubscriptionUseCase>,
}

impl ProcessSubscriptionWorker {
    pub fn new(process: Arc<ProcessSubscriptionUseCase>) -> Self {
        Self { process }
    }
}

#[async_trait]
impl Worker for ProcessSubscriptionWorker {
    fn kind(&self) -> &'static str {
        ProcessSubscription::KIND
    }

    async fn work(&self, job: &JobRecord) -> Result<(), JobError> {
        let args: ProcessSubscription = job.decode()?;
        self.process
            .execute(args.game_subscription_id, Some(job.id))
            .await?;
        Ok(())
    }
}
