//! Games and game instances.

use sqlx::sqlite::SqliteRow;

use playbymail_domain::{Game, GameId, GameInstance, GameInstanceId, GameInstanceStatus};

use super::model::Model;
use super::rows;
use crate::infrastructure::ports::RepoError;

fn row_to_game(row: &SqliteRow) -> Result<Game, RepoError> {
    Ok(Game {
        id: rows::id(row, "id")?,
        name: rows::text(row, "name")?,
        game_type: rows::text(row, "game_type")?,
        description: rows::text(row, "description")?,
        created_at: rows::ts(row, "created_at")?,
        updated_at: rows::ts(row, "updated_at")?,
    })
}

fn row_to_game_instance(row: &SqliteRow) -> Result<GameInstance, RepoError> {
    let game_id: GameId = rows::id(row, "game_id")?;
    let config = rows::json(row, "game_config")?;
    Ok(GameInstance::new(game_id, config, rows::ts(row, "created_at")?)
        .with_id(rows::id(row, "id")?)
        .with_status(rows::parsed(row, "status")?)
        .with_current_turn(rows::int32(row, "current_turn")?)
        .with_last_turn_processed_at(rows::opt_ts(row, "last_turn_processed_at")?)
        .with_next_turn_due_at(rows::opt_ts(row, "next_turn_due_at")?)
        .with_started_at(rows::opt_ts(row, "started_at")?)
        .with_completed_at(rows::opt_ts(row, "completed_at")?)
        .with_timestamps(rows::ts(row, "created_at")?, rows::ts(row, "updated_at")?))
}

const GAME_INSTANCE_COLUMNS: &str = "id, game_id, status, current_turn, last_turn_processed_at, \
     next_turn_due_at, started_at, completed_at, game_config, created_at, updated_at";

impl Model {
    // =========================================================================
    // Game
    // =========================================================================

    pub async fn create_game(&mut self, game: &Game) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO game (id, name, game_type, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(game.id.to_uuid())
        .bind(&game.name)
        .bind(&game.game_type)
        .bind(&game.description)
        .bind(rows::format_ts(game.created_at))
        .bind(rows::format_ts(game.updated_at))
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_game", e))?;
        Ok(())
    }

    pub async fn get_game(&mut self, id: GameId) -> Result<Game, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, game_type, description, created_at, updated_at
            FROM game WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(id.to_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(|e| RepoError::database("get_game", e))?
        .ok_or_else(|| RepoError::not_found("Game", id))?;
        row_to_game(&row)
    }

    // =========================================================================
    // Game instance
    // =========================================================================

    pub async fn create_game_instance(&mut self, instance: &GameInstance) -> Result<(), RepoError> {
        let config = rows::to_json(instance.game_config())?;
        sqlx::query(
            r#"
            INSERT INTO game_instance (
                id, game_id, status, current_turn, last_turn_processed_at, next_turn_due_at,
                started_at, completed_at, game_config, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(instance.id().to_uuid())
        .bind(instance.game_id().to_uuid())
        .bind(instance.status().as_str())
        .bind(instance.current_turn())
        .bind(rows::format_opt_ts(instance.last_turn_processed_at()))
        .bind(rows::format_opt_ts(instance.next_turn_due_at()))
        .bind(rows::format_opt_ts(instance.started_at()))
        .bind(rows::format_opt_ts(instance.completed_at()))
        .bind(config)
        .bind(rows::format_ts(instance.created_at()))
        .bind(rows::format_ts(instance.updated_at()))
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_game_instance", e))?;
        Ok(())
    }

    pub async fn get_game_instance(&mut self, id: GameInstanceId) -> Result<GameInstance, RepoError> {
        let sql = format!(
            "SELECT {} FROM game_instance WHERE id = ? AND deleted_at IS NULL",
            GAME_INSTANCE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("get_game_instance", e))?
            .ok_or_else(|| RepoError::not_found("GameInstance", id))?;
        row_to_game_instance(&row)
    }

    /// Load an instance holding the write lock (the `FOR UPDATE NOWAIT` of this store).
    pub async fn lock_game_instance(
        &mut self,
        id: GameInstanceId,
    ) -> Result<GameInstance, RepoError> {
        self.lock_row("game_instance", "GameInstance", id.to_uuid())
            .await?;
        self.get_game_instance(id).await
    }

    /// Persist lifecycle fields after a domain transition.
    pub async fn update_game_instance(&mut self, instance: &GameInstance) -> Result<(), RepoError> {
        let config = rows::to_json(instance.game_config())?;
        let result = sqlx::query(
            r#"
            UPDATE game_instance SET
                status = ?, current_turn = ?, last_turn_processed_at = ?, next_turn_due_at = ?,
                started_at = ?, completed_at = ?, game_config = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(instance.status().as_str())
        .bind(instance.current_turn())
        .bind(rows::format_opt_ts(instance.last_turn_processed_at()))
        .bind(rows::format_opt_ts(instance.next_turn_due_at()))
        .bind(rows::format_opt_ts(instance.started_at()))
        .bind(rows::format_opt_ts(instance.completed_at()))
        .bind(config)
        .bind(rows::format_ts(instance.updated_at()))
        .bind(instance.id().to_uuid())
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("update_game_instance", e))?;
        if result.rows_affected() == 0 {
            return Err(RepoError::not_found("GameInstance", instance.id()));
        }
        Ok(())
    }

    /// Instances in `started` whose deadline is at or before `now`, oldest deadline first.
    pub async fn list_due_game_instances(&mut self) -> Result<Vec<GameInstance>, RepoError> {
        let now = rows::format_ts(self.now());
        let sql = format!(
            "SELECT {} FROM game_instance \
             WHERE status = ? AND next_turn_due_at IS NOT NULL AND next_turn_due_at <= ? \
               AND deleted_at IS NULL \
             ORDER BY next_turn_due_at, id",
            GAME_INSTANCE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(GameInstanceStatus::Started.as_str())
            .bind(now)
            .fetch_all(self.conn())
            .await
            .map_err(|e| RepoError::database("list_due_game_instances", e))?;
        rows.iter().map(row_to_game_instance).collect()
    }

    /// The newest instance of a game that can still take players.
    pub async fn find_joinable_game_instance(
        &mut self,
        game_id: GameId,
    ) -> Result<Option<GameInstance>, RepoError> {
        let sql = format!(
            "SELECT {} FROM game_instance \
             WHERE game_id = ? AND status IN ('created', 'started', 'processing') \
               AND deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT 1",
            GAME_INSTANCE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(game_id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("find_joinable_game_instance", e))?;
        row.as_ref().map(row_to_game_instance).transpose()
    }
}
