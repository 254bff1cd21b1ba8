//! The `send_turn_sheet_notification_email` job.

use std::sync::Arc;

use sqlx::SqlitePool;

use playbymail_domain::{
    AccountUser, Game, GameInstance, GameTurnSheet, SubscriptionStatus, TurnSheetHeader,
};

use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::{ClockPort, EmailError, EmailMessage, EmailPort, RepoError};
use crate::infrastructure::queue::JobError;
use crate::queue_types::SendTurnSheetNotificationEmail;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Email error: {0}")]
    Email(#[from] EmailError),
}

impl From<NotificationError> for JobError {
    fn from(error: NotificationError) -> Self {
        match &error {
            NotificationError::Repo(e) if e.is_not_found() => JobError::permanent(error.to_string()),
            NotificationError::Email(EmailError::InvalidRecipient(_)) => {
                JobError::permanent(error.to_string())
            }
            _ => JobError::retryable(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent { to: String, sheets: usize },
    /// The account has no sheets for that turn, or the subscription is no longer active.
    NothingToSend,
}

/// Tell a player their sheets for a turn are ready.
pub struct SendTurnSheetNotification {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
    email: Arc<dyn EmailPort>,
}

impl SendTurnSheetNotification {
    pub fn new(pool: SqlitePool, clock: Arc<dyn ClockPort>, email: Arc<dyn EmailPort>) -> Self {
        Self { pool, clock, email }
    }

    pub async fn execute(
        &self,
        args: &SendTurnSheetNotificationEmail,
    ) -> Result<NotificationOutcome, NotificationError> {
        let mut model = Model::begin(&self.pool, Arc::clone(&self.clock)).await?;
        let subscription = model.get_subscription(args.game_subscription_id).await?;
        if subscription.status != SubscriptionStatus::Active {
            return Ok(NotificationOutcome::NothingToSend);
        }
        let user = model.get_primary_account_user(subscription.account_id).await?;
        let instance = model.get_game_instance(args.game_instance_id).await?;
        let game = model.get_game(instance.game_id()).await?;
        let sheets = model
            .list_account_turn_sheets(instance.id(), subscription.account_id, args.turn_number)
            .await?;
        model.rollback().await?;

        if sheets.is_empty() {
            tracing::debug!(
                game_subscription_id = %subscription.id,
                turn_number = args.turn_number,
                "No turn sheets to announce"
            );
            return Ok(NotificationOutcome::NothingToSend);
        }

        let message = compose(&game, &instance, &user, args.turn_number, &sheets);
        self.email.send(&message).await?;
        Ok(NotificationOutcome::Sent {
            to: message.to,
            sheets: sheets.len(),
        })
    }
}

fn compose(
    game: &Game,
    instance: &GameInstance,
    user: &AccountUser,
    turn_number: i32,
    sheets: &[GameTurnSheet],
) -> EmailMessage {
    let greeting = if user.name.trim().is_empty() {
        "Hello,".to_string()
    } else {
        format!("Hello {},", user.name)
    };

    let mut body = vec![
        greeting,
        String::new(),
        format!(
            "Your turn sheets for {} turn {} are ready:",
            game.name, turn_number
        ),
        String::new(),
    ];
    for sheet in sheets {
        let header: TurnSheetHeader =
            serde_json::from_value(sheet.sheet_data().clone()).unwrap_or_default();
        let title = if header.turn_sheet_title.is_empty() {
            sheet.sheet_type().to_string()
        } else {
            header.turn_sheet_title
        };
        body.push(format!("  - {} (code {})", title, header.turn_sheet_code));
    }
    body.push(String::new());
    match instance.next_turn_due_at() {
        Some(due) => body.push(format!(
            "Return your completed sheets before {}.",
            due.format("%Y-%m-%d %H:%M UTC")
        )),
        None => body.push("Return your completed sheets before the next turn.".to_string()),
    }

    EmailMessage {
        to: user.email.clone(),
        subject: format!("{}: turn {} sheets are ready", game.name, turn_number),
        body: body.join("\n"),
    }
}
