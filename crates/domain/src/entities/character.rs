//! Adventure characters
//!
//! A [`Character`] belongs to an account and survives across instances of the
//! same game; a [`CharacterInstance`] is its state inside one instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, CharacterId, CharacterInstanceId, GameId, GameInstanceId, LocationInstanceId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub game_id: GameId,
    pub account_id: AccountId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Character {
    pub fn new(
        game_id: GameId,
        account_id: AccountId,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CharacterId::new(),
            game_id,
            account_id,
            name: name.into(),
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterInstance {
    pub id: CharacterInstanceId,
    pub game_id: GameId,
    pub game_instance_id: GameInstanceId,
    pub character_id: CharacterId,
    /// Always a location instance of the same game instance.
    pub current_location_instance_id: LocationInstanceId,
    pub health: i32,
    pub inventory_capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CharacterInstance {
    pub fn new(
        game_instance_id: GameInstanceId,
        character: &Character,
        location: LocationInstanceId,
        health: i32,
        inventory_capacity: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CharacterInstanceId::new(),
            game_id: character.game_id,
            game_instance_id,
            character_id: character.id,
            current_location_instance_id: location,
            health,
            inventory_capacity,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn move_to(&mut self, location: LocationInstanceId, now: DateTime<Utc>) {
        self.current_location_instance_id = location;
        self.updated_at = now;
    }
}
