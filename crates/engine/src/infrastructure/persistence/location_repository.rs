//! Authored locations, their links, and live location instances.

use sqlx::sqlite::SqliteRow;

use playbymail_domain::{
    GameId, GameInstanceId, Location, LocationId, LocationInstance, LocationInstanceId,
    LocationLink,
};

use super::model::Model;
use super::rows;
use crate::infrastructure::ports::RepoError;

/// A link leaving a location instance, resolved to the destination in the same instance.
#[derive(Debug, Clone)]
pub struct LocationExit {
    pub link: LocationLink,
    pub destination: LocationInstance,
}

fn row_to_location(row: &SqliteRow) -> Result<Location, RepoError> {
    Ok(Location {
        id: rows::id(row, "id")?,
        game_id: rows::id(row, "game_id")?,
        name: rows::text(row, "name")?,
        description: rows::text(row, "description")?,
        is_starting_location: rows::flag(row, "is_starting_location")?,
    })
}

fn row_to_link(row: &SqliteRow) -> Result<LocationLink, RepoError> {
    Ok(LocationLink {
        id: rows::id(row, "link_id")?,
        game_id: rows::id(row, "link_game_id")?,
        from_location_id: rows::id(row, "from_adventure_game_location_id")?,
        to_location_id: rows::id(row, "to_adventure_game_location_id")?,
        name: rows::text(row, "link_name")?,
        description: rows::text(row, "link_description")?,
    })
}

fn row_to_location_instance(row: &SqliteRow) -> Result<LocationInstance, RepoError> {
    Ok(LocationInstance {
        id: rows::id(row, "id")?,
        game_id: rows::id(row, "game_id")?,
        game_instance_id: rows::id(row, "game_instance_id")?,
        location_id: rows::id(row, "adventure_game_location_id")?,
        created_at: rows::ts(row, "created_at")?,
    })
}

const LOCATION_INSTANCE_COLUMNS: &str =
    "li.id, li.game_id, li.game_instance_id, li.adventure_game_location_id, li.created_at";

impl Model {
    // =========================================================================
    // Authored content
    // =========================================================================

    pub async fn create_location(&mut self, location: &Location) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO adventure_game_location (id, game_id, name, description, is_starting_location)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(location.id.to_uuid())
        .bind(location.game_id.to_uuid())
        .bind(&location.name)
        .bind(&location.description)
        .bind(location.is_starting_location)
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_location", e))?;
        Ok(())
    }

    pub async fn get_location(&mut self, id: LocationId) -> Result<Location, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT id, game_id, name, description, is_starting_location
            FROM adventure_game_location WHERE id = ?
            "#,
        )
        .bind(id.to_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(|e| RepoError::database("get_location", e))?
        .ok_or_else(|| RepoError::not_found("Location", id))?;
        row_to_location(&row)
    }

    pub async fn list_locations(&mut self, game_id: GameId) -> Result<Vec<Location>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT id, game_id, name, description, is_starting_location
            FROM adventure_game_location WHERE game_id = ? AND deleted_at IS NULL
            ORDER BY name, id
            "#,
        )
        .bind(game_id.to_uuid())
        .fetch_all(self.conn())
        .await
        .map_err(|e| RepoError::database("list_locations", e))?;
        rows.iter().map(row_to_location).collect()
    }

    pub async fn create_location_link(&mut self, link: &LocationLink) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO adventure_game_location_link (
                id, game_id, from_adventure_game_location_id, to_adventure_game_location_id,
                name, description
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(link.id.to_uuid())
        .bind(link.game_id.to_uuid())
        .bind(link.from_location_id.to_uuid())
        .bind(link.to_location_id.to_uuid())
        .bind(&link.name)
        .bind(&link.description)
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_location_link", e))?;
        Ok(())
    }

    // =========================================================================
    // Live instances
    // =========================================================================

    pub async fn create_location_instance(
        &mut self,
        instance: &LocationInstance,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO adventure_game_location_instance (
                id, game_id, game_instance_id, adventure_game_location_id, created_at
            ) VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(instance.id.to_uuid())
        .bind(instance.game_id.to_uuid())
        .bind(instance.game_instance_id.to_uuid())
        .bind(instance.location_id.to_uuid())
        .bind(rows::format_ts(instance.created_at))
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_location_instance", e))?;
        Ok(())
    }

    pub async fn get_location_instance(
        &mut self,
        id: LocationInstanceId,
    ) -> Result<LocationInstance, RepoError> {
        let sql = format!(
            "SELECT {} FROM adventure_game_location_instance li WHERE li.id = ?",
            LOCATION_INSTANCE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("get_location_instance", e))?
            .ok_or_else(|| RepoError::not_found("LocationInstance", id))?;
        row_to_location_instance(&row)
    }

    pub async fn list_location_instances(
        &mut self,
        game_instance_id: GameInstanceId,
    ) -> Result<Vec<LocationInstance>, RepoError> {
        let sql = format!(
            "SELECT {} FROM adventure_game_location_instance li \
             WHERE li.game_instance_id = ? AND li.deleted_at IS NULL \
             ORDER BY li.created_at, li.id",
            LOCATION_INSTANCE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(game_instance_id.to_uuid())
            .fetch_all(self.conn())
            .await
            .map_err(|e| RepoError::database("list_location_instances", e))?;
        rows.iter().map(row_to_location_instance).collect()
    }

    /// The live instance of the game's starting location.
    pub async fn find_starting_location_instance(
        &mut self,
        game_instance_id: GameInstanceId,
    ) -> Result<Option<LocationInstance>, RepoError> {
        let sql = format!(
            "SELECT {} FROM adventure_game_location_instance li \
             JOIN adventure_game_location l ON l.id = li.adventure_game_location_id \
             WHERE li.game_instance_id = ? AND l.is_starting_location = 1 \
               AND li.deleted_at IS NULL AND l.deleted_at IS NULL \
             ORDER BY l.name, l.id LIMIT 1",
            LOCATION_INSTANCE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(game_instance_id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("find_starting_location_instance", e))?;
        row.as_ref().map(row_to_location_instance).transpose()
    }

    /// Outgoing links of a location instance whose destination exists in the same
    /// game instance, in a stable order.
    pub async fn list_location_exits(
        &mut self,
        from: &LocationInstance,
    ) -> Result<Vec<LocationExit>, RepoError> {
        let sql = format!(
            "SELECT {}, \
                    ll.id AS link_id, ll.game_id AS link_game_id, \
                    ll.from_adventure_game_location_id, ll.to_adventure_game_location_id, \
                    ll.name AS link_name, ll.description AS link_description \
             FROM adventure_game_location_link ll \
             JOIN adventure_game_location_instance li \
               ON li.adventure_game_location_id = ll.to_adventure_game_location_id \
              AND li.game_instance_id = ? \
             WHERE ll.from_adventure_game_location_id = ? \
               AND ll.deleted_at IS NULL AND li.deleted_at IS NULL \
             ORDER BY ll.name, ll.id",
            LOCATION_INSTANCE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(from.game_instance_id.to_uuid())
            .bind(from.location_id.to_uuid())
            .fetch_all(self.conn())
            .await
            .map_err(|e| RepoError::database("list_location_exits", e))?;
        rows.iter()
            .map(|row| {
                Ok(LocationExit {
                    link: row_to_link(row)?,
                    destination: row_to_location_instance(row)?,
                })
            })
            .collect()
    }
}
