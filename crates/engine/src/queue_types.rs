//! Job payloads.
//!
//! Each payload is the JSON stored in `job.args`; its `KIND` routes it to a
//! worker in `infrastructure::queue_workers`.

use serde::{Deserialize, Serialize};

use playbymail_domain::{GameInstanceId, GameSubscriptionId};

use crate::infrastructure::queue::{InsertOpts, JobArgs, QUEUE_DEFAULT, QUEUE_GAME};

/// Periodic tick: find due game instances and enqueue their turns. No arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueGameTurnProcessing {}

impl JobArgs for QueueGameTurnProcessing {
    const KIND: &'static str = "queue_game_turn_processing";

    fn queue() -> &'static str {
        QUEUE_GAME
    }

    fn insert_opts() -> InsertOpts {
        InsertOpts {
            max_attempts: 1,
            unique: true,
            ..Default::default()
        }
    }
}

/// Process one turn of one game instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTurnProcessing {
    pub game_instance_id: GameInstanceId,
    /// The turn the scheduler saw; a mismatch means the job is stale.
    pub turn_number: i32,
}

impl JobArgs for GameTurnProcessing {
    const KIND: &'static str = "game_turn_processing";

    fn queue() -> &'static str {
        QUEUE_GAME
    }

    fn insert_opts() -> InsertOpts {
        InsertOpts {
            unique: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTurnSheetNotificationEmail {
    pub game_subscription_id: GameSubscriptionId,
    pub game_instance_id: GameInstanceId,
    pub turn_number: i32,
}

impl JobArgs for SendTurnSheetNotificationEmail {
    const KIND: &'static str = "send_turn_sheet_notification_email";

    fn queue() -> &'static str {
        QUEUE_DEFAULT
    }

    fn insert_opts() -> InsertOpts {
        InsertOpts {
            max_attempts: 10,
            unique: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSubscription {
    pub game_subscription_id: GameSubscriptionId,
}

impl JobArgs for ProcessSubscription {
    const KIND: &'static str = "process_subscription";

    fn insert_opts() -> InsertOpts {
        InsertOpts {
            unique: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn payloads_use_the_wire_field_names() {
        let id = GameInstanceId::new();
        let args = GameTurnProcessing {
            game_instance_id: id,
            turn_number: 3,
        };
        assert_eq!(
            serde_json::to_value(args).unwrap(),
            json!({ "game_instance_id": id.to_string(), "turn_number": 3 })
        );
        assert_eq!(
            serde_json::to_value(QueueGameTurnProcessing::default()).unwrap(),
            json!({})
        );
    }

    #[test]
    fn turn_jobs_run_on_the_game_queue() {
        assert_eq!(GameTurnProcessing::queue(), QUEUE_GAME);
        assert_eq!(ProcessSubscription::queue(), QUEUE_DEFAULT);
        assert!(QueueGameTurnProcessing::insert_opts().unique);
    }
}
