//! Turn a photo of a returned sheet into stored scan data.

use std::sync::Arc;

use sqlx::SqlitePool;

use playbymail_domain::{GameInstance, GameTurnSheet};

use super::error::TurnSheetError;
use super::processor::{TurnSheetProcessors, TurnSheetServices};
use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::ClockPort;
use crate::infrastructure::turn_sheet_code::TurnSheetCodeParts;

/// Identifies the sheet from its printed code, asks the sheet's processor to read
/// the player's marks, and records the result.
///
/// The extraction call can take minutes, so it runs outside any transaction; the
/// sheet is locked and re-checked only for the final write.
pub struct ScanTurnSheetUpload {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
    services: Arc<TurnSheetServices>,
    processors: Arc<TurnSheetProcessors>,
}

impl ScanTurnSheetUpload {
    pub fn new(
        pool: SqlitePool,
        clock: Arc<dyn ClockPort>,
        services: Arc<TurnSheetServices>,
        processors: Arc<TurnSheetProcessors>,
    ) -> Self {
        Self {
            pool,
            clock,
            services,
            processors,
        }
    }

    pub async fn execute(
        &self,
        image: &[u8],
        code_hint: Option<&str>,
    ) -> Result<GameTurnSheet, TurnSheetError> {
        let parts = self.identify(image, code_hint).await?;

        let (sheet, instance) = {
            let mut model = Model::begin(&self.pool, Arc::clone(&self.clock)).await?;
            let sheet = model.get_turn_sheet(parts.game_turn_sheet_id).await?;
            let instance = model.get_game_instance(sheet.game_instance_id()).await?;
            model.rollback().await?;
            (sheet, instance)
        };
        check_code(&parts, &sheet)?;
        if sheet.is_completed() {
            return Err(TurnSheetError::AlreadyCompleted(sheet.id()));
        }
        check_open_turn(&instance, &sheet)?;

        let processor = self.processors.get(sheet.sheet_type());
        let scanned = match processor.scan_turn_sheet(sheet.sheet_data(), image).await {
            Ok(scanned) => scanned,
            Err(e) if e.is_player_input_error() => {
                tracing::warn!(
                    game_turn_sheet_id = %sheet.id(),
                    error = %e,
                    "Scanned sheet could not be read"
                );
                self.mark_failed(&sheet).await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let mut model = Model::begin(&self.pool, Arc::clone(&self.clock)).await?;
        let instance = model.lock_game_instance(sheet.game_instance_id()).await?;
        let mut sheet = model.lock_turn_sheet(sheet.id()).await?;
        if sheet.is_completed() {
            return Err(TurnSheetError::AlreadyCompleted(sheet.id()));
        }
        check_open_turn(&instance, &sheet)?;
        let now = model.now();
        sheet.record_scan(scanned, now)?;
        model.update_turn_sheet(&sheet).await?;
        model.commit().await?;

        tracing::info!(
            game_turn_sheet_id = %sheet.id(),
            game_instance_id = %sheet.game_instance_id(),
            sheet_type = %sheet.sheet_type(),
            turn_number = sheet.turn_number(),
            "Turn sheet scanned"
        );
        Ok(sheet)
    }

    async fn identify(
        &self,
        image: &[u8],
        code_hint: Option<&str>,
    ) -> Result<TurnSheetCodeParts, TurnSheetError> {
        let codec = &self.services.codec;
        let result = match code_hint {
            Some(code) => codec.decode(code.trim()),
            None => {
                let text = self.services.extractor.extract_text(image).await?;
                codec.find_in_text(&text)
            }
        };
        result.map_err(|e| TurnSheetError::Code(e.to_string()))
    }

    async fn mark_failed(&self, sheet: &GameTurnSheet) -> Result<(), TurnSheetError> {
        let mut model = Model::begin(&self.pool, Arc::clone(&self.clock)).await?;
        let mut sheet = model.lock_turn_sheet(sheet.id()).await?;
        if sheet.is_completed() {
            return Ok(());
        }
        let now = model.now();
        sheet.mark_scan_failed(now)?;
        model.update_turn_sheet(&sheet).await?;
        model.commit().await?;
        Ok(())
    }
}

fn check_code(parts: &TurnSheetCodeParts, sheet: &GameTurnSheet) -> Result<(), TurnSheetError> {
    if parts.game_id != sheet.game_id()
        || parts.game_instance_id != sheet.game_instance_id()
        || parts.account_id != sheet.account_id()
    {
        return Err(TurnSheetError::CodeMismatch(sheet.id()));
    }
    Ok(())
}

/// Only sheets for the instance's current turn can still be scanned.
fn check_open_turn(instance: &GameInstance, sheet: &GameTurnSheet) -> Result<(), TurnSheetError> {
    if instance.status().is_terminal() || sheet.turn_number() != instance.current_turn() {
        tracing::warn!(
            game_turn_sheet_id = %sheet.id(),
            turn_number = sheet.turn_number(),
            current_turn = instance.current_turn(),
            status = %instance.status(),
            "Rejected scan of a closed turn sheet"
        );
        return Err(TurnSheetError::SheetSuperseded(sheet.id()));
    }
    Ok(())
}
