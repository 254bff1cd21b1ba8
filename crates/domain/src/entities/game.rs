//! Game entity - authored content that can be instantiated

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::GameType;
use crate::{DomainError, GameId};

/// A piece of authored content. The `game_type` string is stored verbatim and
/// routed through [`Game::kind`], so rows written by newer builds with unknown
/// types still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub game_type: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    pub fn new(name: impl Into<String>, game_type: GameType, now: DateTime<Utc>) -> Self {
        Self {
            id: GameId::new(),
            name: name.into(),
            game_type: game_type.as_str().to_string(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn kind(&self) -> Result<GameType, DomainError> {
        self.game_type.parse()
    }
}
