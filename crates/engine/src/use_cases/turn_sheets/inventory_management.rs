//! Inventory management: pick up, drop, equip and unequip items.

use std::sync::Arc;

use serde_json::{json, Value};

use playbymail_domain::{
    CharacterInstance, EquipmentSlots, EquippedItem, GameInstance, GameTurnSheet,
    GameTurnSheetId, InventoryItem, InventoryManagementScanData, InventoryManagementSheetData,
    ItemInstance, ItemInstanceId, ItemPlacement, LocationItem, SheetType,
};

use super::error::TurnSheetError;
use super::header::build_header;
use super::processor::{
    extract_json_object, parse_sheet_data, render_document, scanned_json, to_sheet_value,
    DocumentFormat, SheetContext, TurnSheetServices,
};
use super::templates::inventory_management_html;
use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::StructuredExtractionRequest;

const TITLE: &str = "Inventory";
const DESCRIPTION: &str = "Decide what to carry, what to leave and what to wear.";
const INSTRUCTIONS: &str = "Mark the boxes for each item you want to pick up, drop, equip or \
unequip. Items are unequipped first, then dropped, then picked up, then equipped.";

const SCAN_INSTRUCTIONS: &str = "This is a play-by-mail inventory sheet. Compare it with the \
blank sheet and report every box the player marked. Use only item_instance_id values from the \
context. For equip actions give the slot printed next to the item (weapon, armor, clothing or \
jewelry). Use empty lists for columns with no marks.";

pub struct InventoryManagementProcessor {
    services: Arc<TurnSheetServices>,
}

impl InventoryManagementProcessor {
    pub fn new(services: Arc<TurnSheetServices>) -> Self {
        Self { services }
    }

    fn sheet_html(
        sheet_data: &Value,
    ) -> Result<(InventoryManagementSheetData, String), TurnSheetError> {
        let mut data: InventoryManagementSheetData = parse_sheet_data(sheet_data)?;
        data.header.validate()?;
        data.header = data.header.with_defaults(TITLE, DESCRIPTION, INSTRUCTIONS);
        let html = inventory_management_html(&data);
        Ok((data, html))
    }

    pub async fn generate_turn_sheet(
        &self,
        format: DocumentFormat,
        sheet_data: &Value,
    ) -> Result<Vec<u8>, TurnSheetError> {
        let (_, html) = Self::sheet_html(sheet_data)?;
        render_document(&self.services, format, html).await
    }

    pub async fn scan_turn_sheet(
        &self,
        sheet_data: &Value,
        image: &[u8],
    ) -> Result<Value, TurnSheetError> {
        let (data, html) = Self::sheet_html(sheet_data)?;
        let template = self.services.renderer.render_png(&html).await?;

        let request = StructuredExtractionRequest {
            instructions: SCAN_INSTRUCTIONS.to_string(),
            context: scan_context(&data),
            template_image: Some(template),
            filled_image: image.to_vec(),
            schema: json!({
                "pick_up": ["<item_instance_id>"],
                "drop": ["<item_instance_id>"],
                "equip": [{ "item_instance_id": "<item_instance_id>", "slot": "<slot>" }],
                "unequip": ["<item_instance_id>"]
            }),
        };
        let answer = self.services.extractor.extract_structured(&request).await?;

        let scan = InventoryManagementScanData::from_json(&extract_json_object(&answer)?)?;
        scan.validate_against(&data)?;
        to_sheet_value(&scan)
    }

    /// Applies unequip, drop, pick-up, equip in that order against live state.
    pub async fn process_turn_sheet_response(
        &self,
        model: &mut Model,
        instance: &GameInstance,
        character: &mut CharacterInstance,
        sheet: &GameTurnSheet,
    ) -> Result<(), TurnSheetError> {
        let data: InventoryManagementSheetData = parse_sheet_data(sheet.sheet_data())?;
        let scan = InventoryManagementScanData::from_json(&scanned_json(sheet)?)?;
        let plan = scan.validate_against(&data)?;
        if plan.is_empty() {
            return Ok(());
        }
        let now = model.now();
        let here = character.current_location_instance_id;

        for id in &plan.unequip {
            let mut item = carried_item(model, instance, character, *id).await?;
            item.unequip(now);
            model.update_item_instance(&item).await?;
        }

        for id in &plan.drop {
            let mut item = carried_item(model, instance, character, *id).await?;
            item.move_to(ItemPlacement::AtLocation(here), now);
            model.update_item_instance(&item).await?;
        }

        for id in &plan.pick_up {
            let mut item = live_item(model, instance, *id).await?;
            if !item.is_at(here) {
                return Err(TurnSheetError::invalid_choice(format!(
                    "cannot pick up {}: no longer at this location",
                    id
                )));
            }
            item.move_to(ItemPlacement::CarriedByCharacter(character.id), now);
            model.update_item_instance(&item).await?;
        }

        let carried = model.list_items_carried_by(character.id).await?;
        let capacity = usize::try_from(character.inventory_capacity).unwrap_or(0);
        if carried.len() > capacity {
            return Err(TurnSheetError::invalid_choice(format!(
                "inventory would hold {} items, capacity is {}",
                carried.len(),
                capacity
            )));
        }

        for (id, slot) in &plan.equip {
            let mut item = carried_item(model, instance, character, *id).await?;
            let occupant = model
                .list_items_carried_by(character.id)
                .await?
                .into_iter()
                .find(|placed| {
                    placed.instance.id() != *id
                        && placed.instance.is_equipped()
                        && placed.instance.equipment_slot() == Some(*slot)
                });
            if let Some(occupant) = occupant {
                return Err(TurnSheetError::invalid_choice(format!(
                    "{} slot is already occupied by {}",
                    slot, occupant.item.name
                )));
            }
            item.equip(*slot, now)?;
            model.update_item_instance(&item).await?;
        }

        tracing::debug!(
            character_instance_id = %character.id,
            unequipped = plan.unequip.len(),
            dropped = plan.drop.len(),
            picked_up = plan.pick_up.len(),
            equipped = plan.equip.len(),
            "Inventory updated"
        );
        Ok(())
    }

    pub async fn create_next_turn_sheet(
        &self,
        model: &mut Model,
        ctx: SheetContext<'_>,
        character: &CharacterInstance,
    ) -> Result<GameTurnSheet, TurnSheetError> {
        let here = model
            .get_location_instance(character.current_location_instance_id)
            .await?;
        let location = model.get_location(here.location_id).await?;
        let carried = model.list_items_carried_by(character.id).await?;
        let lying = model.list_items_at_location(here.id).await?;

        let mut equipment_slots = EquipmentSlots::default();
        for placed in &carried {
            let Some(slot) = placed.instance.equipment_slot() else {
                continue;
            };
            if placed.instance.is_equipped() {
                equipment_slots.set(
                    slot,
                    EquippedItem {
                        item_instance_id: placed.instance.id(),
                        name: placed.item.name.clone(),
                    },
                );
            }
        }

        let current_inventory: Vec<InventoryItem> = carried
            .iter()
            .map(|placed| InventoryItem {
                item_instance_id: placed.instance.id(),
                name: placed.item.name.clone(),
                description: placed.item.description.clone(),
                is_equipped: placed.instance.is_equipped(),
                equipment_slot: placed.instance.equipment_slot(),
                can_be_equipped: placed.item.can_be_equipped,
                allowed_slot: placed.item.equipment_slot,
            })
            .collect();

        let location_items = lying
            .iter()
            .map(|placed| LocationItem {
                item_instance_id: placed.instance.id(),
                name: placed.item.name.clone(),
                description: placed.item.description.clone(),
                can_be_equipped: placed.item.can_be_equipped,
                allowed_slot: placed.item.equipment_slot,
            })
            .collect();

        let sheet_id = GameTurnSheetId::new();
        let data = InventoryManagementSheetData {
            header: build_header(&self.services.codec, ctx, sheet_id).with_defaults(
                TITLE,
                DESCRIPTION,
                INSTRUCTIONS,
            ),
            character_name: ctx.recipient.character.name.clone(),
            current_location_name: location.name,
            inventory_capacity: character.inventory_capacity,
            inventory_count: i32::try_from(current_inventory.len()).unwrap_or(i32::MAX),
            current_inventory,
            equipment_slots,
            location_items,
        };

        let sheet = GameTurnSheet::new(
            ctx.game.id,
            ctx.instance.id(),
            ctx.recipient.account.id,
            ctx.instance.current_turn(),
            SheetType::InventoryManagement,
            to_sheet_value(&data)?,
            model.now(),
        )
        .with_id(sheet_id);
        model.create_adventure_turn_sheet(&sheet, character.id).await?;
        Ok(sheet)
    }
}

fn scan_context(data: &InventoryManagementSheetData) -> Vec<String> {
    let mut lines = vec![
        format!("Character: {}", data.character_name),
        format!(
            "Carrying {} of {} items",
            data.inventory_count, data.inventory_capacity
        ),
    ];
    for item in &data.current_inventory {
        let state = match item.equipment_slot.filter(|_| item.is_equipped) {
            Some(slot) => format!("equipped as {}", slot),
            None => "carried".to_string(),
        };
        lines.push(format!(
            "Carried item \"{}\" ({}) has item_instance_id {}",
            item.name, state, item.item_instance_id
        ));
    }
    for item in &data.location_items {
        lines.push(format!(
            "Item on the ground \"{}\" has item_instance_id {}",
            item.name, item.item_instance_id
        ));
    }
    lines
}

async fn live_item(
    model: &mut Model,
    instance: &GameInstance,
    id: ItemInstanceId,
) -> Result<ItemInstance, TurnSheetError> {
    let item = model.get_item_instance(id).await.map_err(|e| {
        if e.is_not_found() {
            TurnSheetError::invalid_choice(format!("item {} does not exist", id))
        } else {
            e.into()
        }
    })?;
    if item.game_instance_id() != instance.id() {
        return Err(TurnSheetError::invalid_choice(format!(
            "item {} belongs to another game instance",
            id
        )));
    }
    Ok(item)
}

async fn carried_item(
    model: &mut Model,
    instance: &GameInstance,
    character: &CharacterInstance,
    id: ItemInstanceId,
) -> Result<ItemInstance, TurnSheetError> {
    let item = live_item(model, instance, id).await?;
    if !item.is_carried_by(character.id) {
        return Err(TurnSheetError::invalid_choice(format!(
            "item {} is not carried by this character",
            id
        )));
    }
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use playbymail_domain::EquipmentSlot;

    use crate::test_fixtures::{offline_services, test_db, WorldBuilder};

    async fn give(
        model: &mut Model,
        item: ItemInstanceId,
        character: &CharacterInstance,
        slot: Option<EquipmentSlot>,
    ) {
        let now = model.now();
        let mut instance = model.get_item_instance(item).await.unwrap();
        instance.move_to(ItemPlacement::CarriedByCharacter(character.id), now);
        if let Some(slot) = slot {
            instance.equip(slot, now).unwrap();
        }
        model.update_item_instance(&instance).await.unwrap();
    }

    #[tokio::test]
    async fn applies_unequip_drop_pickup_equip_in_order() {
        let db = test_db().await;
        let mut model = db.model().await;
        let world = WorldBuilder::new("Caves").with_players(1).seed(&mut model).await;
        let player = &world.characters[0];
        let sword = world.item_at_start(&mut model, "Sword").await;
        let dagger = world.item_at_start(&mut model, "Dagger").await;
        let ring = world.item_at_start(&mut model, "Ring").await;
        give(&mut model, sword, &player.instance, Some(EquipmentSlot::Weapon)).await;
        give(&mut model, dagger, &player.instance, None).await;

        let processor = InventoryManagementProcessor::new(offline_services());
        let recipient = player.recipient();
        let ctx = SheetContext {
            game: &world.game,
            instance: &world.instance,
            recipient: &recipient,
        };
        let mut sheet = processor
            .create_next_turn_sheet(&mut model, ctx, &player.instance)
            .await
            .unwrap();

        let data: InventoryManagementSheetData = parse_sheet_data(sheet.sheet_data()).unwrap();
        assert_eq!(data.inventory_count, 2);
        assert_eq!(
            data.equipment_slots.get(EquipmentSlot::Weapon).map(|e| e.item_instance_id),
            Some(sword)
        );
        assert!(data.location_item(ring).is_some());

        let now = model.now();
        sheet
            .record_scan(
                json!({
                    "unequip": [sword],
                    "drop": [sword],
                    "pick_up": [ring],
                    "equip": [{ "item_instance_id": dagger, "slot": "weapon" }]
                }),
                now,
            )
            .unwrap();

        let mut character = player.instance.clone();
        processor
            .process_turn_sheet_response(&mut model, &world.instance, &mut character, &sheet)
            .await
            .unwrap();

        let sword = model.get_item_instance(sword).await.unwrap();
        assert_eq!(sword.placement(), ItemPlacement::AtLocation(world.start.id));
        assert!(!sword.is_equipped());

        let ring = model.get_item_instance(ring).await.unwrap();
        assert_eq!(ring.placement(), ItemPlacement::CarriedByCharacter(character.id));

        let dagger = model.get_item_instance(dagger).await.unwrap();
        assert!(dagger.is_equipped());
        assert_eq!(dagger.equipment_slot(), Some(EquipmentSlot::Weapon));
    }

    #[tokio::test]
    async fn equipping_an_occupied_slot_is_rejected() {
        let db = test_db().await;
        let mut model = db.model().await;
        let world = WorldBuilder::new("Caves").with_players(1).seed(&mut model).await;
        let player = &world.characters[0];
        let sword = world.item_at_start(&mut model, "Sword").await;
        let dagger = world.item_at_start(&mut model, "Dagger").await;
        give(&mut model, sword, &player.instance, Some(EquipmentSlot::Weapon)).await;
        give(&mut model, dagger, &player.instance, None).await;

        let processor = InventoryManagementProcessor::new(offline_services());
        let recipient = player.recipient();
        let ctx = SheetContext {
            game: &world.game,
            instance: &world.instance,
            recipient: &recipient,
        };
        let mut sheet = processor
            .create_next_turn_sheet(&mut model, ctx, &player.instance)
            .await
            .unwrap();
        let now = model.now();
        sheet
            .record_scan(
                json!({ "equip": [{ "item_instance_id": dagger, "slot": "weapon" }] }),
                now,
            )
            .unwrap();

        let mut character = player.instance.clone();
        let err = processor
            .process_turn_sheet_response(&mut model, &world.instance, &mut character, &sheet)
            .await
            .unwrap_err();
        assert!(matches!(err, TurnSheetError::InvalidChoice(_)));
    }
}
