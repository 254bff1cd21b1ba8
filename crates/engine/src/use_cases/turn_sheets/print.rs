//! Render a stored turn sheet for printing.

use std::sync::Arc;

use sqlx::SqlitePool;

use playbymail_domain::GameTurnSheetId;

use super::error::TurnSheetError;
use super::processor::{DocumentFormat, TurnSheetProcessors};
use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::ClockPort;

pub struct PrintTurnSheet {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
    processors: Arc<TurnSheetProcessors>,
}

impl PrintTurnSheet {
    pub fn new(
        pool: SqlitePool,
        clock: Arc<dyn ClockPort>,
        processors: Arc<TurnSheetProcessors>,
    ) -> Self {
        Self {
            pool,
            clock,
            processors,
        }
    }

    pub async fn execute(
        &self,
        id: GameTurnSheetId,
        format: DocumentFormat,
    ) -> Result<Vec<u8>, TurnSheetError> {
        let sheet = {
            let mut model = Model::begin(&self.pool, Arc::clone(&self.clock)).await?;
            let sheet = model.get_turn_sheet(id).await?;
            model.rollback().await?;
            sheet
        };

        let document = self
            .processors
            .get(sheet.sheet_type())
            .generate_turn_sheet(format, sheet.sheet_data())
            .await?;

        tracing::debug!(
            game_turn_sheet_id = %id,
            sheet_type = %sheet.sheet_type(),
            bytes = document.len(),
            "Turn sheet rendered"
        );
        Ok(document)
    }
}
