//! ItemInstance aggregate - a live item somewhere in a game instance
//!
//! Placement is an enum, so "exactly one of location / character / creature" is
//! true by construction. Storage keeps three nullable columns; use
//! [`ItemPlacement::from_columns`] to read them back.

use chrono::{DateTime, Utc};

use crate::value_objects::EquipmentSlot;
use crate::{
    CharacterInstanceId, CreatureInstanceId, DomainError, GameId, GameInstanceId, ItemId,
    ItemInstanceId, LocationInstanceId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemPlacement {
    AtLocation(LocationInstanceId),
    CarriedByCharacter(CharacterInstanceId),
    CarriedByCreature(CreatureInstanceId),
}

impl ItemPlacement {
    /// Rebuild a placement from its three storage columns.
    pub fn from_columns(
        location: Option<LocationInstanceId>,
        character: Option<CharacterInstanceId>,
        creature: Option<CreatureInstanceId>,
    ) -> Result<Self, DomainError> {
        match (location, character, creature) {
            (Some(id), None, None) => Ok(ItemPlacement::AtLocation(id)),
            (None, Some(id), None) => Ok(ItemPlacement::CarriedByCharacter(id)),
            (None, None, Some(id)) => Ok(ItemPlacement::CarriedByCreature(id)),
            _ => Err(DomainError::constraint(
                "item instance must have exactly one placement",
            )),
        }
    }

    pub fn location_instance_id(&self) -> Option<LocationInstanceId> {
        match self {
            ItemPlacement::AtLocation(id) => Some(*id),
            _ => None,
        }
    }

    pub fn character_instance_id(&self) -> Option<CharacterInstanceId> {
        match self {
            ItemPlacement::CarriedByCharacter(id) => Some(*id),
            _ => None,
        }
    }

    pub fn creature_instance_id(&self) -> Option<CreatureInstanceId> {
        match self {
            ItemPlacement::CarriedByCreature(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemInstance {
    id: ItemInstanceId,
    game_id: GameId,
    game_instance_id: GameInstanceId,
    item_id: ItemId,
    placement: ItemPlacement,
    is_equipped: bool,
    equipment_slot: Option<EquipmentSlot>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ItemInstance {
    pub fn new(
        game_id: GameId,
        game_instance_id: GameInstanceId,
        item_id: ItemId,
        placement: ItemPlacement,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ItemInstanceId::new(),
            game_id,
            game_instance_id,
            item_id,
            placement,
            is_equipped: false,
            equipment_slot: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn id(&self) -> ItemInstanceId {
        self.id
    }

    #[inline]
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    #[inline]
    pub fn game_instance_id(&self) -> GameInstanceId {
        self.game_instance_id
    }

    #[inline]
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    #[inline]
    pub fn placement(&self) -> ItemPlacement {
        self.placement
    }

    #[inline]
    pub fn is_equipped(&self) -> bool {
        self.is_equipped
    }

    #[inline]
    pub fn equipment_slot(&self) -> Option<EquipmentSlot> {
        self.equipment_slot
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_carried_by(&self, character: CharacterInstanceId) -> bool {
        self.placement == ItemPlacement::CarriedByCharacter(character)
    }

    pub fn is_at(&self, location: LocationInstanceId) -> bool {
        self.placement == ItemPlacement::AtLocation(location)
    }

    // =========================================================================
    // Builder Methods (for reconstitution from storage)
    // =========================================================================

    pub fn with_id(mut self, id: ItemInstanceId) -> Self {
        self.id = id;
        self
    }

    pub fn with_equipment(mut self, is_equipped: bool, slot: Option<EquipmentSlot>) -> Self {
        self.is_equipped = is_equipped;
        self.equipment_slot = slot;
        self
    }

    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Move the item. Leaving a character always unequips it.
    pub fn move_to(&mut self, placement: ItemPlacement, now: DateTime<Utc>) {
        if self.placement != placement {
            self.placement = placement;
            self.is_equipped = false;
            self.equipment_slot = None;
            self.updated_at = now;
        }
    }

    pub fn equip(&mut self, slot: EquipmentSlot, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !matches!(self.placement, ItemPlacement::CarriedByCharacter(_)) {
            return Err(DomainError::constraint(format!(
                "item {} must be carried to be equipped",
                self.id
            )));
        }
        self.is_equipped = true;
        self.equipment_slot = Some(slot);
        self.updated_at = now;
        Ok(())
    }

    pub fn unequip(&mut self, now: DateTime<Utc>) {
        if self.is_equipped {
            self.is_equipped = false;
            self.equipment_slot = None;
            self.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carried_sword(owner: CharacterInstanceId) -> ItemInstance {
        let mut item = ItemInstance::new(
            GameId::new(),
            GameInstanceId::new(),
            ItemId::new(),
            ItemPlacement::CarriedByCharacter(owner),
            Utc::now(),
        );
        item.equip(EquipmentSlot::Weapon, Utc::now()).unwrap();
        item
    }

    #[test]
    fn columns_must_name_exactly_one_placement() {
        let loc = LocationInstanceId::new();
        let chr = CharacterInstanceId::new();

        assert_eq!(
            ItemPlacement::from_columns(Some(loc), None, None).unwrap(),
            ItemPlacement::AtLocation(loc)
        );
        assert!(ItemPlacement::from_columns(None, None, None).is_err());
        assert!(ItemPlacement::from_columns(Some(loc), Some(chr), None).is_err());
    }

    #[test]
    fn dropping_clears_equipment() {
        let owner = CharacterInstanceId::new();
        let floor = LocationInstanceId::new();
        let mut sword = carried_sword(owner);

        sword.move_to(ItemPlacement::AtLocation(floor), Utc::now());

        assert!(sword.is_at(floor));
        assert!(!sword.is_carried_by(owner));
        assert!(!sword.is_equipped());
        assert_eq!(sword.equipment_slot(), None);
        assert_eq!(sword.placement().character_instance_id(), None);
    }

    #[test]
    fn only_carried_items_can_be_equipped() {
        let mut rock = ItemInstance::new(
            GameId::new(),
            GameInstanceId::new(),
            ItemId::new(),
            ItemPlacement::AtLocation(LocationInstanceId::new()),
            Utc::now(),
        );
        assert!(rock.equip(EquipmentSlot::Weapon, Utc::now()).is_err());
    }
}
