//! Authored creatures, their placements, and live creature instances.

use sqlx::sqlite::SqliteRow;

use playbymail_domain::{Creature, CreatureInstance, CreaturePlacement, GameId, GameInstanceId};

use super::model::Model;
use super::rows;
use crate::infrastructure::ports::RepoError;

fn row_to_creature(row: &SqliteRow) -> Result<Creature, RepoError> {
    Ok(Creature {
        id: rows::id(row, "id")?,
        game_id: rows::id(row, "game_id")?,
        name: rows::text(row, "name")?,
        description: rows::text(row, "description")?,
        max_health: rows::int32(row, "max_health")?,
    })
}

fn row_to_creature_placement(row: &SqliteRow) -> Result<CreaturePlacement, RepoError> {
    Ok(CreaturePlacement {
        id: rows::id(row, "id")?,
        game_id: rows::id(row, "game_id")?,
        creature_id: rows::id(row, "adventure_game_creature_id")?,
        location_id: rows::id(row, "adventure_game_location_id")?,
        initial_count: rows::int32(row, "initial_count")?,
    })
}

fn row_to_creature_instance(row: &SqliteRow) -> Result<CreatureInstance, RepoError> {
    Ok(CreatureInstance {
        id: rows::id(row, "id")?,
        game_id: rows::id(row, "game_id")?,
        game_instance_id: rows::id(row, "game_instance_id")?,
        creature_id: rows::id(row, "adventure_game_creature_id")?,
        location_instance_id: rows::id(row, "adventure_game_location_instance_id")?,
        health: rows::int32(row, "health")?,
        created_at: rows::ts(row, "created_at")?,
    })
}

impl Model {
    pub async fn create_creature(&mut self, creature: &Creature) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO adventure_game_creature (id, game_id, name, description, max_health)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(creature.id.to_uuid())
        .bind(creature.game_id.to_uuid())
        .bind(&creature.name)
        .bind(&creature.description)
        .bind(creature.max_health)
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_creature", e))?;
        Ok(())
    }

    pub async fn list_creatures(&mut self, game_id: GameId) -> Result<Vec<Creature>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT id, game_id, name, description, max_health
            FROM adventure_game_creature WHERE game_id = ? AND deleted_at IS NULL
            ORDER BY name, id
            "#,
        )
        .bind(game_id.to_uuid())
        .fetch_all(self.conn())
        .await
        .map_err(|e| RepoError::database("list_creatures", e))?;
        rows.iter().map(row_to_creature).collect()
    }

    pub async fn create_creature_placement(
        &mut self,
        placement: &CreaturePlacement,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO adventure_game_creature_placement (
                id, game_id, adventure_game_creature_id, adventure_game_location_id, initial_count
            ) VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(placement.id.to_uuid())
        .bind(placement.game_id.to_uuid())
        .bind(placement.creature_id.to_uuid())
        .bind(placement.location_id.to_uuid())
        .bind(placement.initial_count)
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_creature_placement", e))?;
        Ok(())
    }

    pub async fn list_creature_placements(
        &mut self,
        game_id: GameId,
    ) -> Result<Vec<CreaturePlacement>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT id, game_id, adventure_game_creature_id, adventure_game_location_id, initial_count
            FROM adventure_game_creature_placement WHERE game_id = ? AND deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .bind(game_id.to_uuid())
        .fetch_all(self.conn())
        .await
        .map_err(|e| RepoError::database("list_creature_placements", e))?;
        rows.iter().map(row_to_creature_placement).collect()
    }

    pub async fn create_creature_instance(
        &mut self,
        instance: &CreatureInstance,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO adventure_game_creature_instance (
                id, game_id, game_instance_id, adventure_game_creature_id,
                adventure_game_location_instance_id, health, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(instance.id.to_uuid())
        .bind(instance.game_id.to_uuid())
        .bind(instance.game_instance_id.to_uuid())
        .bind(instance.creature_id.to_uuid())
        .bind(instance.location_instance_id.to_uuid())
        .bind(instance.health)
        .bind(rows::format_ts(instance.created_at))
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_creature_instance", e))?;
        Ok(())
    }

    pub async fn list_creature_instances(
        &mut self,
        game_instance_id: GameInstanceId,
    ) -> Result<Vec<CreatureInstance>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT id, game_id, game_instance_id, adventure_game_creature_id,
                   adventure_game_location_instance_id, health, created_at
            FROM adventure_game_creature_instance WHERE game_instance_id = ? AND deleted_at IS NULL
            ORDER BY created_at, id
            "#,
        )
        .bind(game_instance_id.to_uuid())
        .fetch_all(self.conn())
        .await
        .map_err(|e| RepoError::database("list_creature_instances", e))?;
        rows.iter().map(row_to_creature_instance).collect()
    }
}
