use serde::{Deserialize, Serialize};

use crate::value_objects::EquipmentSlot;
use crate::{GameId, ItemId, ItemPlacementId, LocationId};

/// An authored item. Live copies are [`crate::ItemInstance`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub game_id: GameId,
    pub name: String,
    pub description: String,
    pub can_be_equipped: bool,
    /// Slot the item is made for; `None` fits any slot.
    pub equipment_slot: Option<EquipmentSlot>,
    pub item_category: Option<String>,
}

impl Item {
    pub fn new(game_id: GameId, name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            game_id,
            name: name.into(),
            description: String::new(),
            can_be_equipped: false,
            equipment_slot: None,
            item_category: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn equippable(mut self, slot: Option<EquipmentSlot>) -> Self {
        self.can_be_equipped = true;
        self.equipment_slot = slot;
        self
    }
}

/// Where an authored item appears when a game instance starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPlacementTemplate {
    pub id: ItemPlacementId,
    pub game_id: GameId,
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub initial_count: i32,
}

impl ItemPlacementTemplate {
    pub fn new(game_id: GameId, item_id: ItemId, location_id: LocationId, initial_count: i32) -> Self {
        Self {
            id: ItemPlacementId::new(),
            game_id,
            item_id,
            location_id,
            initial_count,
        }
    }
}
