//! Scanned responses as stored on `game_turn_sheet.scanned_data`
//!
//! Parsing and validation live here so the scanner (when it accepts a scan) and
//! the turn processor (when it applies one) agree on what is valid.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::value_objects::{EquipmentSlot, InventoryManagementSheetData, LocationChoiceSheetData};
use crate::{DomainError, ItemInstanceId, LocationInstanceId};

fn parse_scan<T: DeserializeOwned>(json: &str) -> Result<T, DomainError> {
    serde_json::from_str(json).map_err(|e| DomainError::invalid_scan_data(e.to_string()))
}

fn ensure_unique<T: Eq + Hash + std::fmt::Display + Copy>(
    field: &str,
    ids: impl IntoIterator<Item = T>,
) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(DomainError::invalid_scan_data(format!(
                "{} lists {} more than once",
                field, id
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Location choice
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationChoiceScanData {
    #[serde(default)]
    pub choices: Vec<LocationInstanceId>,
}

impl LocationChoiceScanData {
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        parse_scan(json)
    }

    /// Returns the single chosen destination.
    pub fn validate_against(
        &self,
        sheet: &LocationChoiceSheetData,
    ) -> Result<LocationInstanceId, DomainError> {
        let [choice] = self.choices.as_slice() else {
            return Err(DomainError::invalid_scan_data(format!(
                "expected exactly one location choice, found {}",
                self.choices.len()
            )));
        };

        if !sheet.offers(*choice) {
            return Err(DomainError::invalid_choice(format!(
                "location {} was not offered from {}",
                choice, sheet.location_name
            )));
        }

        Ok(*choice)
    }
}

// =============================================================================
// Inventory management
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquipAction {
    pub item_instance_id: ItemInstanceId,
    pub slot: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryManagementScanData {
    #[serde(default)]
    pub pick_up: Vec<ItemInstanceId>,
    #[serde(default)]
    pub drop: Vec<ItemInstanceId>,
    #[serde(default)]
    pub equip: Vec<EquipAction>,
    #[serde(default)]
    pub unequip: Vec<ItemInstanceId>,
}

/// Validated inventory actions, in the order they must be applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryPlan {
    pub unequip: Vec<ItemInstanceId>,
    pub drop: Vec<ItemInstanceId>,
    pub pick_up: Vec<ItemInstanceId>,
    pub equip: Vec<(ItemInstanceId, EquipmentSlot)>,
}

impl InventoryPlan {
    pub fn is_empty(&self) -> bool {
        self.unequip.is_empty()
            && self.drop.is_empty()
            && self.pick_up.is_empty()
            && self.equip.is_empty()
    }
}

impl InventoryManagementScanData {
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        parse_scan(json)
    }

    /// Checks every action against what the sheet offered, then checks capacity
    /// and slot exclusivity as they would stand after unequip, drop, pick-up, equip.
    pub fn validate_against(
        &self,
        sheet: &InventoryManagementSheetData,
    ) -> Result<InventoryPlan, DomainError> {
        ensure_unique("unequip", self.unequip.iter().copied())?;
        ensure_unique("drop", self.drop.iter().copied())?;
        ensure_unique("pick_up", self.pick_up.iter().copied())?;
        ensure_unique("equip", self.equip.iter().map(|a| a.item_instance_id))?;

        for id in &self.unequip {
            match sheet.inventory_item(*id) {
                None => {
                    return Err(DomainError::invalid_choice(format!(
                        "cannot unequip {}: not in inventory",
                        id
                    )))
                }
                Some(item) if !item.is_equipped => {
                    return Err(DomainError::invalid_choice(format!(
                        "cannot unequip {}: not equipped",
                        item.name
                    )))
                }
                Some(_) => {}
            }
        }

        for id in &self.drop {
            if sheet.inventory_item(*id).is_none() {
                return Err(DomainError::invalid_choice(format!(
                    "cannot drop {}: not in inventory",
                    id
                )));
            }
        }

        for id in &self.pick_up {
            if sheet.location_item(*id).is_none() {
                return Err(DomainError::invalid_choice(format!(
                    "cannot pick up {}: not at this location",
                    id
                )));
            }
        }

        let mut equip = Vec::with_capacity(self.equip.len());
        for action in &self.equip {
            let id = action.item_instance_id;
            let slot: EquipmentSlot = action.slot.parse().map_err(|_| {
                DomainError::invalid_scan_data(format!("unknown equipment slot '{}'", action.slot))
            })?;

            let (name, can_be_equipped, allowed_slot) = if let Some(item) = sheet.inventory_item(id)
            {
                (&item.name, item.can_be_equipped, item.allowed_slot)
            } else if let Some(item) = sheet
                .location_item(id)
                .filter(|_| self.pick_up.contains(&id))
            {
                (&item.name, item.can_be_equipped, item.allowed_slot)
            } else {
                return Err(DomainError::invalid_choice(format!(
                    "cannot equip {}: not carried and not being picked up",
                    id
                )));
            };

            if self.drop.contains(&id) {
                return Err(DomainError::invalid_choice(format!(
                    "cannot both drop and equip {}",
                    name
                )));
            }
            if !can_be_equipped {
                return Err(DomainError::invalid_choice(format!(
                    "{} cannot be equipped",
                    name
                )));
            }
            if let Some(allowed) = allowed_slot.filter(|allowed| *allowed != slot) {
                return Err(DomainError::invalid_choice(format!(
                    "{} goes in the {} slot, not {}",
                    name, allowed, slot
                )));
            }
            equip.push((id, slot));
        }

        let carried = sheet.current_inventory.len() - self.drop.len() + self.pick_up.len();
        let capacity = usize::try_from(sheet.inventory_capacity).unwrap_or(0);
        if carried > capacity {
            return Err(DomainError::invalid_choice(format!(
                "inventory would hold {} items, capacity is {}",
                carried, capacity
            )));
        }

        let mut occupied: HashMap<EquipmentSlot, ItemInstanceId> = sheet
            .current_inventory
            .iter()
            .filter(|item| item.is_equipped)
            .filter(|item| !self.unequip.contains(&item.item_instance_id))
            .filter(|item| !self.drop.contains(&item.item_instance_id))
            .filter_map(|item| item.equipment_slot.map(|slot| (slot, item.item_instance_id)))
            .collect();

        for (id, slot) in &equip {
            if let Some(existing) = occupied.get(slot).filter(|existing| *existing != id) {
                return Err(DomainError::invalid_choice(format!(
                    "{} slot is already occupied by {}",
                    slot, existing
                )));
            }
            occupied.retain(|_, occupant| *occupant != *id);
            occupied.insert(*slot, *id);
        }

        Ok(InventoryPlan {
            unequip: self.unequip.clone(),
            drop: self.drop.clone(),
            pick_up: self.pick_up.clone(),
            equip,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{
        EquipmentSlots, EquippedItem, InventoryItem, LocationItem, LocationOption,
        TurnSheetHeader,
    };

    fn location_sheet(options: &[LocationInstanceId]) -> LocationChoiceSheetData {
        LocationChoiceSheetData {
            header: TurnSheetHeader::default(),
            location_name: "Crossroads".into(),
            location_description: String::new(),
            location_options: options
                .iter()
                .map(|id| LocationOption {
                    location_id: *id,
                    location_link_name: format!("Path to {}", id),
                    location_link_description: String::new(),
                })
                .collect(),
        }
    }

    fn carried(id: ItemInstanceId, name: &str, equipped: Option<EquipmentSlot>) -> InventoryItem {
        InventoryItem {
            item_instance_id: id,
            name: name.into(),
            description: String::new(),
            is_equipped: equipped.is_some(),
            equipment_slot: equipped,
            can_be_equipped: true,
            allowed_slot: None,
        }
    }

    fn lying(id: ItemInstanceId, name: &str) -> LocationItem {
        LocationItem {
            item_instance_id: id,
            name: name.into(),
            description: String::new(),
            can_be_equipped: true,
            allowed_slot: None,
        }
    }

    fn inventory_sheet(
        inventory: Vec<InventoryItem>,
        location_items: Vec<LocationItem>,
        capacity: i32,
    ) -> InventoryManagementSheetData {
        let mut slots = EquipmentSlots::default();
        for item in inventory.iter().filter(|i| i.is_equipped) {
            if let Some(slot) = item.equipment_slot {
                slots.set(
                    slot,
                    EquippedItem {
                        item_instance_id: item.item_instance_id,
                        name: item.name.clone(),
                    },
                );
            }
        }
        InventoryManagementSheetData {
            header: TurnSheetHeader::default(),
            character_name: "Mara".into(),
            current_location_name: "Armory".into(),
            inventory_capacity: capacity,
            inventory_count: inventory.len() as i32,
            current_inventory: inventory,
            equipment_slots: slots,
            location_items,
        }
    }

    #[test]
    fn location_choice_accepts_an_offered_destination() {
        let (a, b) = (LocationInstanceId::new(), LocationInstanceId::new());
        let scan = LocationChoiceScanData { choices: vec![b] };

        assert_eq!(scan.validate_against(&location_sheet(&[a, b])).unwrap(), b);
    }

    #[test]
    fn location_choice_rejects_unoffered_destination() {
        let sheet = location_sheet(&[LocationInstanceId::new()]);
        let scan = LocationChoiceScanData {
            choices: vec![LocationInstanceId::new()],
        };

        assert!(matches!(
            scan.validate_against(&sheet),
            Err(DomainError::InvalidChoice(_))
        ));
    }

    #[test]
    fn location_choice_requires_exactly_one_choice() {
        let (a, b) = (LocationInstanceId::new(), LocationInstanceId::new());
        let sheet = location_sheet(&[a, b]);

        let none = LocationChoiceScanData { choices: vec![] };
        let both = LocationChoiceScanData { choices: vec![a, b] };
        assert!(matches!(none.validate_against(&sheet), Err(DomainError::InvalidScanData(_))));
        assert!(matches!(both.validate_against(&sheet), Err(DomainError::InvalidScanData(_))));
    }

    #[test]
    fn malformed_scan_json_is_invalid_scan_data() {
        assert!(matches!(
            LocationChoiceScanData::from_json("{\"choices\": [\"nope\"]}"),
            Err(DomainError::InvalidScanData(_))
        ));
        assert!(matches!(
            InventoryManagementScanData::from_json("{\"juggle\": []}"),
            Err(DomainError::InvalidScanData(_))
        ));
    }

    #[test]
    fn swap_weapon_while_picking_up() {
        let (sword, dagger, shield) = (
            ItemInstanceId::new(),
            ItemInstanceId::new(),
            ItemInstanceId::new(),
        );
        let sheet = inventory_sheet(
            vec![
                carried(sword, "Sword", Some(EquipmentSlot::Weapon)),
                carried(dagger, "Dagger", None),
            ],
            vec![lying(shield, "Shield")],
            10,
        );
        let scan = InventoryManagementScanData {
            unequip: vec![sword],
            drop: vec![sword],
            pick_up: vec![shield],
            equip: vec![EquipAction {
                item_instance_id: dagger,
                slot: "weapon".into(),
            }],
        };

        let plan = scan.validate_against(&sheet).unwrap();

        assert_eq!(plan.unequip, vec![sword]);
        assert_eq!(plan.drop, vec![sword]);
        assert_eq!(plan.pick_up, vec![shield]);
        assert_eq!(plan.equip, vec![(dagger, EquipmentSlot::Weapon)]);
    }

    #[test]
    fn equipping_into_an_occupied_slot_is_rejected() {
        let (sword, dagger) = (ItemInstanceId::new(), ItemInstanceId::new());
        let sheet = inventory_sheet(
            vec![
                carried(sword, "Sword", Some(EquipmentSlot::Weapon)),
                carried(dagger, "Dagger", None),
            ],
            vec![],
            10,
        );
        let scan = InventoryManagementScanData {
            equip: vec![EquipAction {
                item_instance_id: dagger,
                slot: "Weapon".into(),
            }],
            ..Default::default()
        };

        assert!(matches!(
            scan.validate_against(&sheet),
            Err(DomainError::InvalidChoice(msg)) if msg.contains("occupied")
        ));
    }

    #[test]
    fn picking_up_past_capacity_is_rejected() {
        let (a, b) = (ItemInstanceId::new(), ItemInstanceId::new());
        let sheet = inventory_sheet(vec![carried(a, "Rope", None)], vec![lying(b, "Lamp")], 1);
        let scan = InventoryManagementScanData {
            pick_up: vec![b],
            ..Default::default()
        };

        assert!(matches!(
            scan.validate_against(&sheet),
            Err(DomainError::InvalidChoice(msg)) if msg.contains("capacity")
        ));
    }

    #[test]
    fn dropping_makes_room_for_pick_up() {
        let (a, b) = (ItemInstanceId::new(), ItemInstanceId::new());
        let sheet = inventory_sheet(vec![carried(a, "Rope", None)], vec![lying(b, "Lamp")], 1);
        let scan = InventoryManagementScanData {
            drop: vec![a],
            pick_up: vec![b],
            ..Default::default()
        };

        assert!(scan.validate_against(&sheet).is_ok());
    }

    #[test]
    fn ids_outside_the_sheet_are_invalid_choices() {
        let sheet = inventory_sheet(vec![], vec![], 5);
        let stranger = ItemInstanceId::new();

        for scan in [
            InventoryManagementScanData {
                drop: vec![stranger],
                ..Default::default()
            },
            InventoryManagementScanData {
                pick_up: vec![stranger],
                ..Default::default()
            },
            InventoryManagementScanData {
                unequip: vec![stranger],
                ..Default::default()
            },
        ] {
            assert!(matches!(
                scan.validate_against(&sheet),
                Err(DomainError::InvalidChoice(_))
            ));
        }
    }

    #[test]
    fn equipping_an_item_left_on_the_floor_is_rejected() {
        let lamp = ItemInstanceId::new();
        let sheet = inventory_sheet(vec![], vec![lying(lamp, "Lamp")], 5);
        let scan = InventoryManagementScanData {
            equip: vec![EquipAction {
                item_instance_id: lamp,
                slot: "jewelry".into(),
            }],
            ..Default::default()
        };

        assert!(matches!(
            scan.validate_against(&sheet),
            Err(DomainError::InvalidChoice(_))
        ));
    }

    #[test]
    fn unknown_slot_is_invalid_scan_data() {
        let dagger = ItemInstanceId::new();
        let sheet = inventory_sheet(vec![carried(dagger, "Dagger", None)], vec![], 5);
        let scan = InventoryManagementScanData {
            equip: vec![EquipAction {
                item_instance_id: dagger,
                slot: "left pocket".into(),
            }],
            ..Default::default()
        };

        assert!(matches!(
            scan.validate_against(&sheet),
            Err(DomainError::InvalidScanData(_))
        ));
    }

    #[test]
    fn two_items_into_one_slot_is_rejected() {
        let (ring, amulet) = (ItemInstanceId::new(), ItemInstanceId::new());
        let sheet = inventory_sheet(
            vec![carried(ring, "Ring", None), carried(amulet, "Amulet", None)],
            vec![],
            5,
        );
        let scan = InventoryManagementScanData {
            equip: vec![
                EquipAction {
                    item_instance_id: ring,
                    slot: "jewelry".into(),
                },
                EquipAction {
                    item_instance_id: amulet,
                    slot: "jewelry".into(),
                },
            ],
            ..Default::default()
        };

        assert!(matches!(
            scan.validate_against(&sheet),
            Err(DomainError::InvalidChoice(_))
        ));
    }
}
