//! GameSubscription entity - joins an account to a game

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{AccountId, DomainError, GameId, GameInstanceId, GameSubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionType {
    Player,
    Manager,
    Designer,
}

impl SubscriptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionType::Player => "player",
            SubscriptionType::Manager => "manager",
            SubscriptionType::Designer => "designer",
        }
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(SubscriptionType::Player),
            "manager" => Ok(SubscriptionType::Manager),
            "designer" => Ok(SubscriptionType::Designer),
            other => Err(DomainError::parse(format!("unknown subscription type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    PendingApproval,
    Active,
    Revoked,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::PendingApproval => "pending_approval",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_approval" => Ok(SubscriptionStatus::PendingApproval),
            "active" => Ok(SubscriptionStatus::Active),
            "revoked" => Ok(SubscriptionStatus::Revoked),
            other => Err(DomainError::parse(format!(
                "unknown subscription status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSubscription {
    pub id: GameSubscriptionId,
    pub game_id: GameId,
    pub account_id: AccountId,
    /// Instance the subscription is bound to, once known.
    pub game_instance_id: Option<GameInstanceId>,
    pub subscription_type: SubscriptionType,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameSubscription {
    pub fn new(
        game_id: GameId,
        account_id: AccountId,
        subscription_type: SubscriptionType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: GameSubscriptionId::new(),
            game_id,
            account_id,
            game_instance_id: None,
            subscription_type,
            status: SubscriptionStatus::PendingApproval,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_game_instance(mut self, game_instance_id: GameInstanceId) -> Self {
        self.game_instance_id = Some(game_instance_id);
        self
    }

    pub fn is_player(&self) -> bool {
        self.subscription_type == SubscriptionType::Player
    }

    /// Activate, optionally binding to an instance. Revoked subscriptions stay revoked.
    pub fn activate(
        &mut self,
        game_instance_id: Option<GameInstanceId>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status == SubscriptionStatus::Revoked {
            return Err(DomainError::conflicting_state(format!(
                "subscription {} is revoked",
                self.id
            )));
        }
        self.status = SubscriptionStatus::Active;
        if game_instance_id.is_some() {
            self.game_instance_id = game_instance_id;
        }
        self.updated_at = now;
        Ok(())
    }
}
