//! Adventure locations
//!
//! Authored locations form a directed graph that may contain cycles. The graph is
//! stored as rows: [`Location`] nodes and [`LocationLink`] edges keyed by
//! from/to ids. A game instance gets one [`LocationInstance`] per authored
//! location; links are resolved through the authored ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GameId, GameInstanceId, LocationId, LocationInstanceId, LocationLinkId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub game_id: GameId,
    pub name: String,
    pub description: String,
    /// New characters enter the world here.
    pub is_starting_location: bool,
}

impl Location {
    pub fn new(game_id: GameId, name: impl Into<String>) -> Self {
        Self {
            id: LocationId::new(),
            game_id,
            name: name.into(),
            description: String::new(),
            is_starting_location: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn as_starting_location(mut self) -> Self {
        self.is_starting_location = true;
        self
    }
}

/// A one-way pathway between two authored locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationLink {
    pub id: LocationLinkId,
    pub game_id: GameId,
    pub from_location_id: LocationId,
    pub to_location_id: LocationId,
    pub name: String,
    pub description: String,
}

impl LocationLink {
    pub fn new(
        game_id: GameId,
        from_location_id: LocationId,
        to_location_id: LocationId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: LocationLinkId::new(),
            game_id,
            from_location_id,
            to_location_id,
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInstance {
    pub id: LocationInstanceId,
    pub game_id: GameId,
    pub game_instance_id: GameInstanceId,
    pub location_id: LocationId,
    pub created_at: DateTime<Utc>,
}

impl LocationInstance {
    pub fn new(
        game_id: GameId,
        game_instance_id: GameInstanceId,
        location_id: LocationId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LocationInstanceId::new(),
            game_id,
            game_instance_id,
            location_id,
            created_at: now,
        }
    }
}
