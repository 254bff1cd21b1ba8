//! Adventure characters and their per-instance state.

use sqlx::sqlite::SqliteRow;

use playbymail_domain::{
    AccountId, Character, CharacterInstance, CharacterInstanceId, GameId, GameInstanceId,
};

use super::model::Model;
use super::rows;
use crate::infrastructure::ports::RepoError;

fn row_to_character(row: &SqliteRow) -> Result<Character, RepoError> {
    Ok(Character {
        id: rows::id(row, "id")?,
        game_id: rows::id(row, "game_id")?,
        account_id: rows::id(row, "account_id")?,
        name: rows::text(row, "name")?,
        created_at: rows::ts(row, "created_at")?,
    })
}

fn row_to_character_instance(row: &SqliteRow) -> Result<CharacterInstance, RepoError> {
    Ok(CharacterInstance {
        id: rows::id(row, "id")?,
        game_id: rows::id(row, "game_id")?,
        game_instance_id: rows::id(row, "game_instance_id")?,
        character_id: rows::id(row, "adventure_game_character_id")?,
        current_location_instance_id: rows::id(row, "adventure_game_location_instance_id")?,
        health: rows::int32(row, "health")?,
        inventory_capacity: rows::int32(row, "inventory_capacity")?,
        created_at: rows::ts(row, "created_at")?,
        updated_at: rows::ts(row, "updated_at")?,
    })
}

const CHARACTER_INSTANCE_COLUMNS: &str = "ci.id, ci.game_id, ci.game_instance_id, \
     ci.adventure_game_character_id, ci.adventure_game_location_instance_id, ci.health, \
     ci.inventory_capacity, ci.created_at, ci.updated_at";

impl Model {
    // =========================================================================
    // Character
    // =========================================================================

    pub async fn create_character(&mut self, character: &Character) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO adventure_game_character (id, game_id, account_id, name, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(character.id.to_uuid())
        .bind(character.game_id.to_uuid())
        .bind(character.account_id.to_uuid())
        .bind(&character.name)
        .bind(rows::format_ts(character.created_at))
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_character", e))?;
        Ok(())
    }

    pub async fn find_character_for_account(
        &mut self,
        game_id: GameId,
        account_id: AccountId,
    ) -> Result<Option<Character>, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT id, game_id, account_id, name, created_at
            FROM adventure_game_character WHERE game_id = ? AND account_id = ?
            "#,
        )
        .bind(game_id.to_uuid())
        .bind(account_id.to_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(|e| RepoError::database("find_character_for_account", e))?;
        row.as_ref().map(row_to_character).transpose()
    }

    pub async fn get_character_for_instance(
        &mut self,
        character_instance: &CharacterInstance,
    ) -> Result<Character, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT id, game_id, account_id, name, created_at
            FROM adventure_game_character WHERE id = ?
            "#,
        )
        .bind(character_instance.character_id.to_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(|e| RepoError::database("get_character", e))?
        .ok_or_else(|| RepoError::not_found("Character", character_instance.character_id))?;
        row_to_character(&row)
    }

    // =========================================================================
    // Character instance
    // =========================================================================

    pub async fn create_character_instance(
        &mut self,
        instance: &CharacterInstance,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO adventure_game_character_instance (
                id, game_id, game_instance_id, adventure_game_character_id,
                adventure_game_location_instance_id, health, inventory_capacity,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(instance.id.to_uuid())
        .bind(instance.game_id.to_uuid())
        .bind(instance.game_instance_id.to_uuid())
        .bind(instance.character_id.to_uuid())
        .bind(instance.current_location_instance_id.to_uuid())
        .bind(instance.health)
        .bind(instance.inventory_capacity)
        .bind(rows::format_ts(instance.created_at))
        .bind(rows::format_ts(instance.updated_at))
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_character_instance", e))?;
        Ok(())
    }

    pub async fn get_character_instance(
        &mut self,
        id: CharacterInstanceId,
    ) -> Result<CharacterInstance, RepoError> {
        let sql = format!(
            "SELECT {} FROM adventure_game_character_instance ci WHERE ci.id = ?",
            CHARACTER_INSTANCE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("get_character_instance", e))?
            .ok_or_else(|| RepoError::not_found("CharacterInstance", id))?;
        row_to_character_instance(&row)
    }

    pub async fn update_character_instance(
        &mut self,
        instance: &CharacterInstance,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE adventure_game_character_instance SET
                adventure_game_location_instance_id = ?, health = ?, inventory_capacity = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(instance.current_location_instance_id.to_uuid())
        .bind(instance.health)
        .bind(instance.inventory_capacity)
        .bind(rows::format_ts(instance.updated_at))
        .bind(instance.id.to_uuid())
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("update_character_instance", e))?;
        if result.rows_affected() == 0 {
            return Err(RepoError::not_found("CharacterInstance", instance.id));
        }
        Ok(())
    }

    /// Every character in an instance, in join order.
    pub async fn list_character_instances(
        &mut self,
        game_instance_id: GameInstanceId,
    ) -> Result<Vec<CharacterInstance>, RepoError> {
        let sql = format!(
            "SELECT {} FROM adventure_game_character_instance ci \
             WHERE ci.game_instance_id = ? AND ci.deleted_at IS NULL \
             ORDER BY ci.created_at, ci.id",
            CHARACTER_INSTANCE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(game_instance_id.to_uuid())
            .fetch_all(self.conn())
            .await
            .map_err(|e| RepoError::database("list_character_instances", e))?;
        rows.iter().map(row_to_character_instance).collect()
    }

    pub async fn find_character_instance_for_account(
        &mut self,
        game_instance_id: GameInstanceId,
        account_id: AccountId,
    ) -> Result<Option<CharacterInstance>, RepoError> {
        let sql = format!(
            "SELECT {} FROM adventure_game_character_instance ci \
             JOIN adventure_game_character c ON c.id = ci.adventure_game_character_id \
             WHERE ci.game_instance_id = ? AND c.account_id = ? AND ci.deleted_at IS NULL",
            CHARACTER_INSTANCE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(game_instance_id.to_uuid())
            .bind(account_id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("find_character_instance_for_account", e))?;
        row.as_ref().map(row_to_character_instance).transpose()
    }
}
