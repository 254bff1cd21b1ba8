use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CreatureId, CreatureInstanceId, CreaturePlacementId, GameId, GameInstanceId, LocationId,
    LocationInstanceId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub id: CreatureId,
    pub game_id: GameId,
    pub name: String,
    pub description: String,
    pub max_health: i32,
}

impl Creature {
    pub fn new(game_id: GameId, name: impl Into<String>, max_health: i32) -> Self {
        Self {
            id: CreatureId::new(),
            game_id,
            name: name.into(),
            description: String::new(),
            max_health,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreaturePlacement {
    pub id: CreaturePlacementId,
    pub game_id: GameId,
    pub creature_id: CreatureId,
    pub location_id: LocationId,
    pub initial_count: i32,
}

impl CreaturePlacement {
    pub fn new(
        game_id: GameId,
        creature_id: CreatureId,
        location_id: LocationId,
        initial_count: i32,
    ) -> Self {
        Self {
            id: CreaturePlacementId::new(),
            game_id,
            creature_id,
            location_id,
            initial_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureInstance {
    pub id: CreatureInstanceId,
    pub game_id: GameId,
    pub game_instance_id: GameInstanceId,
    pub creature_id: CreatureId,
    pub location_instance_id: LocationInstanceId,
    pub health: i32,
    pub created_at: DateTime<Utc>,
}

impl CreatureInstance {
    pub fn new(
        game_id: GameId,
        game_instance_id: GameInstanceId,
        creature: &Creature,
        location_instance_id: LocationInstanceId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CreatureInstanceId::new(),
            game_id,
            game_instance_id,
            creature_id: creature.id,
            location_instance_id,
            health: creature.max_health,
            created_at: now,
        }
    }
}
