//! Turn sheets and their adventure link rows.

use sqlx::sqlite::SqliteRow;

use playbymail_domain::{
    AccountId, AdventureGameTurnSheet, CharacterInstanceId, GameInstanceId, GameTurnSheet,
    GameTurnSheetId,
};

use super::model::Model;
use super::rows;
use crate::infrastructure::ports::RepoError;

const COLUMNS: &str = "ts.id, ts.game_id, ts.game_instance_id, ts.account_id, ts.turn_number, \
     ts.sheet_type, ts.sheet_order, ts.sheet_data, ts.scanned_data, ts.scanned_at, \
     ts.processing_status, ts.is_completed, ts.completed_at, ts.created_at, ts.updated_at";

fn row_to_turn_sheet(row: &SqliteRow) -> Result<GameTurnSheet, RepoError> {
    Ok(GameTurnSheet::new(
        rows::id(row, "game_id")?,
        rows::id(row, "game_instance_id")?,
        rows::id(row, "account_id")?,
        rows::int32(row, "turn_number")?,
        rows::parsed(row, "sheet_type")?,
        rows::json(row, "sheet_data")?,
        rows::ts(row, "created_at")?,
    )
    .with_id(rows::id(row, "id")?)
    .with_sheet_order(rows::int32(row, "sheet_order")?)
    .with_scan(
        rows::opt_json(row, "scanned_data")?,
        rows::opt_ts(row, "scanned_at")?,
    )
    .with_processing_status(rows::parsed(row, "processing_status")?)
    .with_completion(
        rows::flag(row, "is_completed")?,
        rows::opt_ts(row, "completed_at")?,
    )
    .with_timestamps(rows::ts(row, "created_at")?, rows::ts(row, "updated_at")?))
}

impl Model {
    /// Insert a sheet and the link row naming the character it was made for.
    pub async fn create_adventure_turn_sheet(
        &mut self,
        sheet: &GameTurnSheet,
        character_instance_id: CharacterInstanceId,
    ) -> Result<(), RepoError> {
        let sheet_data = rows::to_json(sheet.sheet_data())?;
        let scanned_data = sheet.scanned_data().map(rows::to_json).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO game_turn_sheet (
                id, game_id, game_instance_id, account_id, turn_number, sheet_type, sheet_order,
                sheet_data, scanned_data, scanned_at, processing_status, is_completed,
                completed_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sheet.id().to_uuid())
        .bind(sheet.game_id().to_uuid())
        .bind(sheet.game_instance_id().to_uuid())
        .bind(sheet.account_id().to_uuid())
        .bind(sheet.turn_number())
        .bind(sheet.sheet_type().as_str())
        .bind(sheet.sheet_order())
        .bind(sheet_data)
        .bind(scanned_data)
        .bind(rows::format_opt_ts(sheet.scanned_at()))
        .bind(sheet.processing_status().as_str())
        .bind(sheet.is_completed())
        .bind(rows::format_opt_ts(sheet.completed_at()))
        .bind(rows::format_ts(sheet.created_at()))
        .bind(rows::format_ts(sheet.updated_at()))
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_turn_sheet", e))?;

        let link =
            AdventureGameTurnSheet::new(sheet.game_id(), character_instance_id, sheet.id());
        sqlx::query(
            r#"
            INSERT INTO adventure_game_turn_sheet (
                id, game_id, adventure_game_character_instance_id, game_turn_sheet_id
            ) VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(link.id.to_uuid())
        .bind(link.game_id.to_uuid())
        .bind(link.character_instance_id.to_uuid())
        .bind(link.game_turn_sheet_id.to_uuid())
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_adventure_turn_sheet", e))?;
        Ok(())
    }

    pub async fn get_turn_sheet(&mut self, id: GameTurnSheetId) -> Result<GameTurnSheet, RepoError> {
        let sql = format!("SELECT {} FROM game_turn_sheet ts WHERE ts.id = ?", COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("get_turn_sheet", e))?
            .ok_or_else(|| RepoError::not_found("GameTurnSheet", id))?;
        row_to_turn_sheet(&row)
    }

    pub async fn lock_turn_sheet(&mut self, id: GameTurnSheetId) -> Result<GameTurnSheet, RepoError> {
        self.lock_row("game_turn_sheet", "GameTurnSheet", id.to_uuid())
            .await?;
        self.get_turn_sheet(id).await
    }

    /// Persist scan and completion fields. Sheet data never changes after creation.
    pub async fn update_turn_sheet(&mut self, sheet: &GameTurnSheet) -> Result<(), RepoError> {
        let scanned_data = sheet.scanned_data().map(rows::to_json).transpose()?;
        let result = sqlx::query(
            r#"
            UPDATE game_turn_sheet SET
                scanned_data = ?, scanned_at = ?, processing_status = ?, is_completed = ?,
                completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(scanned_data)
        .bind(rows::format_opt_ts(sheet.scanned_at()))
        .bind(sheet.processing_status().as_str())
        .bind(sheet.is_completed())
        .bind(rows::format_opt_ts(sheet.completed_at()))
        .bind(rows::format_ts(sheet.updated_at()))
        .bind(sheet.id().to_uuid())
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("update_turn_sheet", e))?;
        if result.rows_affected() == 0 {
            return Err(RepoError::not_found("GameTurnSheet", sheet.id()));
        }
        Ok(())
    }

    /// A character's sheets for one turn in processing order.
    pub async fn list_character_turn_sheets(
        &mut self,
        character_instance_id: CharacterInstanceId,
        turn_number: i32,
    ) -> Result<Vec<GameTurnSheet>, RepoError> {
        let sql = format!(
            "SELECT {} FROM game_turn_sheet ts \
             JOIN adventure_game_turn_sheet agts ON agts.game_turn_sheet_id = ts.id \
             WHERE agts.adventure_game_character_instance_id = ? AND ts.turn_number = ? \
               AND ts.deleted_at IS NULL \
             ORDER BY ts.turn_number, ts.sheet_order, ts.id",
            COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(character_instance_id.to_uuid())
            .bind(turn_number)
            .fetch_all(self.conn())
            .await
            .map_err(|e| RepoError::database("list_character_turn_sheets", e))?;
        rows.iter().map(row_to_turn_sheet).collect()
    }

    pub async fn list_account_turn_sheets(
        &mut self,
        game_instance_id: GameInstanceId,
        account_id: AccountId,
        turn_number: i32,
    ) -> Result<Vec<GameTurnSheet>, RepoError> {
        let sql = format!(
            "SELECT {} FROM game_turn_sheet ts \
             WHERE ts.game_instance_id = ? AND ts.account_id = ? AND ts.turn_number = ? \
               AND ts.deleted_at IS NULL \
             ORDER BY ts.sheet_order, ts.id",
            COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(game_instance_id.to_uuid())
            .bind(account_id.to_uuid())
            .bind(turn_number)
            .fetch_all(self.conn())
            .await
            .map_err(|e| RepoError::database("list_account_turn_sheets", e))?;
        rows.iter().map(row_to_turn_sheet).collect()
    }
}
