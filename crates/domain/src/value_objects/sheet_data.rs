//! Turn sheet documents as stored on `game_turn_sheet.sheet_data`
//!
//! The sheet data is the single source of truth for what a player was offered.
//! Rendering, scanning and response processing all read it; nothing writes it
//! after the sheet row is created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::EquipmentSlot;
use crate::{DomainError, ItemInstanceId, LocationInstanceId};

/// Fields printed at the top of every turn sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnSheetHeader {
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub game_type: String,
    #[serde(default)]
    pub turn_number: i32,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub account_email: String,
    #[serde(default)]
    pub turn_sheet_title: String,
    #[serde(default)]
    pub turn_sheet_description: String,
    #[serde(default)]
    pub turn_sheet_instructions: String,
    #[serde(default)]
    pub turn_sheet_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub turn_sheet_code: String,
}

impl TurnSheetHeader {
    /// Game name and a positive turn number are required to print a sheet.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.game_name.trim().is_empty() {
            return Err(DomainError::validation("turn sheet is missing game_name"));
        }
        if self.turn_number <= 0 {
            return Err(DomainError::validation(format!(
                "turn sheet has invalid turn_number {}",
                self.turn_number
            )));
        }
        Ok(())
    }

    /// Fill in blank title, description and instructions.
    pub fn with_defaults(mut self, title: &str, description: &str, instructions: &str) -> Self {
        if self.turn_sheet_title.trim().is_empty() {
            self.turn_sheet_title = title.to_string();
        }
        if self.turn_sheet_description.trim().is_empty() {
            self.turn_sheet_description = description.to_string();
        }
        if self.turn_sheet_instructions.trim().is_empty() {
            self.turn_sheet_instructions = instructions.to_string();
        }
        self
    }
}

// =============================================================================
// Location choice
// =============================================================================

/// One outgoing pathway the player may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationOption {
    /// Destination location instance.
    pub location_id: LocationInstanceId,
    pub location_link_name: String,
    #[serde(default)]
    pub location_link_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationChoiceSheetData {
    #[serde(flatten)]
    pub header: TurnSheetHeader,
    pub location_name: String,
    #[serde(default)]
    pub location_description: String,
    #[serde(default)]
    pub location_options: Vec<LocationOption>,
}

impl LocationChoiceSheetData {
    pub fn offers(&self, location_id: LocationInstanceId) -> bool {
        self.location_options
            .iter()
            .any(|option| option.location_id == location_id)
    }
}

// =============================================================================
// Inventory management
// =============================================================================

/// An item the character is carrying when the sheet was generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_instance_id: ItemInstanceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_equipped: bool,
    /// Slot the item occupies while equipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_slot: Option<EquipmentSlot>,
    #[serde(default)]
    pub can_be_equipped: bool,
    /// Slot the item is made for, when the item template names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_slot: Option<EquipmentSlot>,
}

/// An item lying at the character's current location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationItem {
    pub item_instance_id: ItemInstanceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub can_be_equipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_slot: Option<EquipmentSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquippedItem {
    pub item_instance_id: ItemInstanceId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSlots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<EquippedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor: Option<EquippedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clothing: Option<EquippedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jewelry: Option<EquippedItem>,
}

impl EquipmentSlots {
    pub fn get(&self, slot: EquipmentSlot) -> Option<&EquippedItem> {
        match slot {
            EquipmentSlot::Weapon => self.weapon.as_ref(),
            EquipmentSlot::Armor => self.armor.as_ref(),
            EquipmentSlot::Clothing => self.clothing.as_ref(),
            EquipmentSlot::Jewelry => self.jewelry.as_ref(),
        }
    }

    pub fn set(&mut self, slot: EquipmentSlot, item: EquippedItem) {
        let target = match slot {
            EquipmentSlot::Weapon => &mut self.weapon,
            EquipmentSlot::Armor => &mut self.armor,
            EquipmentSlot::Clothing => &mut self.clothing,
            EquipmentSlot::Jewelry => &mut self.jewelry,
        };
        *target = Some(item);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryManagementSheetData {
    #[serde(flatten)]
    pub header: TurnSheetHeader,
    pub character_name: String,
    pub current_location_name: String,
    pub inventory_capacity: i32,
    pub inventory_count: i32,
    #[serde(default)]
    pub current_inventory: Vec<InventoryItem>,
    #[serde(default)]
    pub equipment_slots: EquipmentSlots,
    #[serde(default)]
    pub location_items: Vec<LocationItem>,
}

impl InventoryManagementSheetData {
    pub fn inventory_item(&self, id: ItemInstanceId) -> Option<&InventoryItem> {
        self.current_inventory
            .iter()
            .find(|item| item.item_instance_id == id)
    }

    pub fn location_item(&self, id: ItemInstanceId) -> Option<&LocationItem> {
        self.location_items
            .iter()
            .find(|item| item.item_instance_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> TurnSheetHeader {
        TurnSheetHeader {
            game_name: "The Sunken Keep".into(),
            game_type: "adventure".into(),
            turn_number: 4,
            account_name: "Mara".into(),
            ..Default::default()
        }
    }

    #[test]
    fn header_requires_game_name_and_turn() {
        assert!(header().validate().is_ok());

        let mut missing_name = header();
        missing_name.game_name = "  ".into();
        assert!(matches!(missing_name.validate(), Err(DomainError::Validation(_))));

        let mut missing_turn = header();
        missing_turn.turn_number = 0;
        assert!(missing_turn.validate().is_err());
    }

    #[test]
    fn defaults_only_fill_blanks() {
        let mut h = header();
        h.turn_sheet_title = "Custom".into();
        let filled = h.with_defaults("Where next?", "Pick a path", "Tick one box");

        assert_eq!(filled.turn_sheet_title, "Custom");
        assert_eq!(filled.turn_sheet_description, "Pick a path");
        assert_eq!(filled.turn_sheet_instructions, "Tick one box");
    }

    #[test]
    fn location_sheet_header_is_flattened() {
        let sheet = LocationChoiceSheetData {
            header: header(),
            location_name: "Gatehouse".into(),
            location_description: String::new(),
            location_options: vec![],
        };
        let value = serde_json::to_value(&sheet).unwrap();

        assert_eq!(value["game_name"], "The Sunken Keep");
        assert_eq!(value["turn_number"], 4);
        assert_eq!(value["location_name"], "Gatehouse");
        assert!(value.get("header").is_none());
    }

    #[test]
    fn equipment_slots_serialize_only_filled_slots() {
        let mut slots = EquipmentSlots::default();
        slots.set(
            EquipmentSlot::Weapon,
            EquippedItem {
                item_instance_id: ItemInstanceId::new(),
                name: "Rusty Sword".into(),
            },
        );
        let value = serde_json::to_value(&slots).unwrap();

        assert!(value.get("weapon").is_some());
        assert!(value.get("armor").is_none());
        assert_eq!(slots.get(EquipmentSlot::Weapon).unwrap().name, "Rusty Sword");
    }
}
