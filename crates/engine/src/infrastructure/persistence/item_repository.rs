//! Authored items, their placements, and live item instances.

use sqlx::sqlite::SqliteRow;

use playbymail_domain::{
    CharacterInstanceId, GameId, Item, ItemId, ItemInstance, ItemInstanceId,
    ItemPlacement, ItemPlacementTemplate, LocationInstanceId,
};

use super::model::Model;
use super::rows;
use crate::infrastructure::ports::RepoError;

/// A live item together with the authored item it was made from.
#[derive(Debug, Clone)]
pub struct PlacedItem {
    pub instance: ItemInstance,
    pub item: Item,
}

fn row_to_item(row: &SqliteRow) -> Result<Item, RepoError> {
    Ok(Item {
        id: rows::id(row, "item_id")?,
        game_id: rows::id(row, "item_game_id")?,
        name: rows::text(row, "item_name")?,
        description: rows::text(row, "item_description")?,
        can_be_equipped: rows::flag(row, "item_can_be_equipped")?,
        equipment_slot: rows::opt_parsed(row, "item_equipment_slot")?,
        item_category: rows::opt_text(row, "item_category")?,
    })
}

fn row_to_item_placement(row: &SqliteRow) -> Result<ItemPlacementTemplate, RepoError> {
    Ok(ItemPlacementTemplate {
        id: rows::id(row, "id")?,
        game_id: rows::id(row, "game_id")?,
        item_id: rows::id(row, "adventure_game_item_id")?,
        location_id: rows::id(row, "adventure_game_location_id")?,
        initial_count: rows::int32(row, "initial_count")?,
    })
}

fn row_to_item_instance(row: &SqliteRow) -> Result<ItemInstance, RepoError> {
    let placement = ItemPlacement::from_columns(
        rows::opt_id(row, "adventure_game_location_instance_id")?,
        rows::opt_id(row, "adventure_game_character_instance_id")?,
        rows::opt_id(row, "adventure_game_creature_instance_id")?,
    )
    .map_err(RepoError::constraint)?;

    Ok(ItemInstance::new(
        rows::id(row, "game_id")?,
        rows::id(row, "game_instance_id")?,
        rows::id(row, "adventure_game_item_id")?,
        placement,
        rows::ts(row, "created_at")?,
    )
    .with_id(rows::id(row, "id")?)
    .with_equipment(
        rows::flag(row, "is_equipped")?,
        rows::opt_parsed(row, "equipment_slot")?,
    )
    .with_timestamps(rows::ts(row, "created_at")?, rows::ts(row, "updated_at")?))
}

const ITEM_COLUMNS: &str = "i.id AS item_id, i.game_id AS item_game_id, i.name AS item_name, \
     i.description AS item_description, i.can_be_equipped AS item_can_be_equipped, \
     i.equipment_slot AS item_equipment_slot, i.item_category";

const ITEM_INSTANCE_COLUMNS: &str = "ii.id, ii.game_id, ii.game_instance_id, \
     ii.adventure_game_item_id, ii.adventure_game_location_instance_id, \
     ii.adventure_game_character_instance_id, ii.adventure_game_creature_instance_id, \
     ii.is_equipped, ii.equipment_slot, ii.created_at, ii.updated_at";

impl Model {
    // =========================================================================
    // Authored content
    // =========================================================================

    pub async fn create_item(&mut self, item: &Item) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO adventure_game_item (
                id, game_id, name, description, can_be_equipped, equipment_slot, item_category
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_uuid())
        .bind(item.game_id.to_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.can_be_equipped)
        .bind(item.equipment_slot.map(|slot| slot.as_str()))
        .bind(&item.item_category)
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_item", e))?;
        Ok(())
    }

    pub async fn get_item(&mut self, id: ItemId) -> Result<Item, RepoError> {
        let sql = format!("SELECT {} FROM adventure_game_item i WHERE i.id = ?", ITEM_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("get_item", e))?
            .ok_or_else(|| RepoError::not_found("Item", id))?;
        row_to_item(&row)
    }

    pub async fn create_item_placement(
        &mut self,
        placement: &ItemPlacementTemplate,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO adventure_game_item_placement (
                id, game_id, adventure_game_item_id, adventure_game_location_id, initial_count
            ) VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(placement.id.to_uuid())
        .bind(placement.game_id.to_uuid())
        .bind(placement.item_id.to_uuid())
        .bind(placement.location_id.to_uuid())
        .bind(placement.initial_count)
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_item_placement", e))?;
        Ok(())
    }

    pub async fn list_item_placements(
        &mut self,
        game_id: GameId,
    ) -> Result<Vec<ItemPlacementTemplate>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT id, game_id, adventure_game_item_id, adventure_game_location_id, initial_count
            FROM adventure_game_item_placement WHERE game_id = ? AND deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .bind(game_id.to_uuid())
        .fetch_all(self.conn())
        .await
        .map_err(|e| RepoError::database("list_item_placements", e))?;
        rows.iter().map(row_to_item_placement).collect()
    }

    // =========================================================================
    // Live instances
    // =========================================================================

    pub async fn create_item_instance(&mut self, instance: &ItemInstance) -> Result<(), RepoError> {
        let placement = instance.placement();
        sqlx::query(
            r#"
            INSERT INTO adventure_game_item_instance (
                id, game_id, game_instance_id, adventure_game_item_id,
                adventure_game_location_instance_id, adventure_game_character_instance_id,
                adventure_game_creature_instance_id, is_equipped, equipment_slot,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(instance.id().to_uuid())
        .bind(instance.game_id().to_uuid())
        .bind(instance.game_instance_id().to_uuid())
        .bind(instance.item_id().to_uuid())
        .bind(placement.location_instance_id().map(|id| id.to_uuid()))
        .bind(placement.character_instance_id().map(|id| id.to_uuid()))
        .bind(placement.creature_instance_id().map(|id| id.to_uuid()))
        .bind(instance.is_equipped())
        .bind(instance.equipment_slot().map(|slot| slot.as_str()))
        .bind(rows::format_ts(instance.created_at()))
        .bind(rows::format_ts(instance.updated_at()))
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_item_instance", e))?;
        Ok(())
    }

    pub async fn get_item_instance(&mut self, id: ItemInstanceId) -> Result<ItemInstance, RepoError> {
        let sql = format!(
            "SELECT {} FROM adventure_game_item_instance ii WHERE ii.id = ?",
            ITEM_INSTANCE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("get_item_instance", e))?
            .ok_or_else(|| RepoError::not_found("ItemInstance", id))?;
        row_to_item_instance(&row)
    }

    /// Writes all three placement columns at once, so an item is never in two places.
    pub async fn update_item_instance(&mut self, instance: &ItemInstance) -> Result<(), RepoError> {
        let placement = instance.placement();
        let result = sqlx::query(
            r#"
            UPDATE adventure_game_item_instance SET
                adventure_game_location_instance_id = ?,
                adventure_game_character_instance_id = ?,
                adventure_game_creature_instance_id = ?,
                is_equipped = ?, equipment_slot = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(placement.location_instance_id().map(|id| id.to_uuid()))
        .bind(placement.character_instance_id().map(|id| id.to_uuid()))
        .bind(placement.creature_instance_id().map(|id| id.to_uuid()))
        .bind(instance.is_equipped())
        .bind(instance.equipment_slot().map(|slot| slot.as_str()))
        .bind(rows::format_ts(instance.updated_at()))
        .bind(instance.id().to_uuid())
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("update_item_instance", e))?;
        if result.rows_affected() == 0 {
            return Err(RepoError::not_found("ItemInstance", instance.id()));
        }
        Ok(())
    }

    pub async fn list_items_carried_by(
        &mut self,
        character_instance_id: CharacterInstanceId,
    ) -> Result<Vec<PlacedItem>, RepoError> {
        self.list_placed_items(
            "ii.adventure_game_character_instance_id = ?",
            character_instance_id.to_uuid(),
            "list_items_carried_by",
        )
        .await
    }

    pub async fn list_items_at_location(
        &mut self,
        location_instance_id: LocationInstanceId,
    ) -> Result<Vec<PlacedItem>, RepoError> {
        self.list_placed_items(
            "ii.adventure_game_location_instance_id = ?",
            location_instance_id.to_uuid(),
            "list_items_at_location",
        )
        .await
    }

    async fn list_placed_items(
        &mut self,
        filter: &str,
        owner: uuid::Uuid,
        operation: &'static str,
    ) -> Result<Vec<PlacedItem>, RepoError> {
        let sql = format!(
            "SELECT {}, {} FROM adventure_game_item_instance ii \
             JOIN adventure_game_item i ON i.id = ii.adventure_game_item_id \
             WHERE {} AND ii.deleted_at IS NULL AND i.deleted_at IS NULL \
             ORDER BY i.name, ii.id",
            ITEM_INSTANCE_COLUMNS, ITEM_COLUMNS, filter
        );
        let rows = sqlx::query(&sql)
            .bind(owner)
            .fetch_all(self.conn())
            .await
            .map_err(|e| RepoError::database(operation, e))?;
        rows.iter()
            .map(|row| {
                Ok(PlacedItem {
                    instance: row_to_item_instance(row)?,
                    item: row_to_item(row)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_fixtures::{test_db, WorldBuilder};

    use super::*;

    #[tokio::test]
    async fn moving_an_item_rewrites_every_placement_column() {
        let db = test_db().await;
        let mut model = db.model().await;
        let world = WorldBuilder::new("Caves").with_players(1).seed(&mut model).await;
        let character = world.characters[0].instance.id;
        let sword = world.item_at_start(&mut model, "Sword").await;

        let mut instance = model.get_item_instance(sword).await.unwrap();
        let now = model.now();
        instance.move_to(ItemPlacement::CarriedByCharacter(character), now);
        model.update_item_instance(&instance).await.unwrap();

        let carried = model.list_items_carried_by(character).await.unwrap();
        assert_eq!(carried.len(), 1);
        assert_eq!(carried[0].item.name, "Sword");
        let at_start = model
            .list_items_at_location(world.start.id)
            .await
            .unwrap();
        assert!(at_start.iter().all(|placed| placed.instance.id() != sword));
    }

    #[tokio::test]
    async fn storage_rejects_an_item_in_two_places() {
        let db = test_db().await;
        let mut model = db.model().await;
        let world = WorldBuilder::new("Caves").with_players(1).seed(&mut model).await;
        let sword = world.item_at_start(&mut model, "Sword").await;

        let result = sqlx::query(
            "UPDATE adventure_game_item_instance SET adventure_game_character_instance_id = ? WHERE id = ?",
        )
        .bind(world.characters[0].instance.id.to_uuid())
        .bind(sword.to_uuid())
        .execute(model.conn())
        .await;
        assert!(result.is_err());
    }
}
