//! The adventure game type: applies each character's returned sheets and
//! prints the next ones.

use std::sync::Arc;

use playbymail_domain::{CharacterInstance, Game, GameInstance, GameTurnSheet};

use crate::infrastructure::persistence::Model;
use crate::use_cases::turn_sheets::{
    SheetContext, SheetRecipient, TurnSheetError, TurnSheetProcessors,
};
use crate::use_cases::turns::{CharacterFailure, TurnProcessingError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseSummary {
    pub characters: usize,
    pub sheets_processed: usize,
    /// Sheets the player never sent back.
    pub sheets_unreturned: usize,
}

pub struct AdventureGame {
    processors: Arc<TurnSheetProcessors>,
}

impl AdventureGame {
    pub fn new(processors: Arc<TurnSheetProcessors>) -> Self {
        Self { processors }
    }

    /// Apply every character's scanned sheets for the instance's current turn.
    ///
    /// Characters are read once up front. Every character is attempted; if any
    /// failed, the whole turn fails with all of their errors.
    pub async fn process_responses(
        &self,
        model: &mut Model,
        instance: &GameInstance,
    ) -> Result<ResponseSummary, TurnProcessingError> {
        let characters = model.list_character_instances(instance.id()).await?;
        let mut summary = ResponseSummary {
            characters: characters.len(),
            ..Default::default()
        };
        let mut failures = Vec::new();

        for mut character in characters {
            if let Err(failure) = self
                .process_character(model, instance, &mut character, &mut summary)
                .await
            {
                tracing::warn!(
                    game_instance_id = %instance.id(),
                    character_instance_id = %failure.character_instance_id,
                    error = %failure.error,
                    "Character turn failed"
                );
                failures.push(failure);
            }
        }

        if !failures.is_empty() {
            return Err(TurnProcessingError::CharacterFailures(failures));
        }
        Ok(summary)
    }

    async fn process_character(
        &self,
        model: &mut Model,
        instance: &GameInstance,
        character: &mut CharacterInstance,
        summary: &mut ResponseSummary,
    ) -> Result<(), CharacterFailure> {
        let character_instance_id = character.id;
        let failure = |sheet: Option<&GameTurnSheet>, error: TurnSheetError| CharacterFailure {
            character_instance_id,
            game_turn_sheet_id: sheet.map(GameTurnSheet::id),
            error,
        };

        let sheets = model
            .list_character_turn_sheets(character.id, instance.current_turn())
            .await
            .map_err(|e| failure(None, e.into()))?;

        for sheet in sheets {
            if sheet.is_completed() {
                continue;
            }
            if sheet.scanned_data().is_none() {
                tracing::debug!(
                    game_turn_sheet_id = %sheet.id(),
                    sheet_type = %sheet.sheet_type(),
                    "Sheet not returned, skipping"
                );
                summary.sheets_unreturned += 1;
                continue;
            }

            let mut locked = model
                .lock_turn_sheet(sheet.id())
                .await
                .map_err(|e| failure(Some(&sheet), e.into()))?;
            self.processors
                .get(locked.sheet_type())
                .process_turn_sheet_response(model, instance, character, &locked)
                .await
                .map_err(|e| failure(Some(&sheet), e))?;

            let now = model.now();
            locked
                .mark_processed(now)
                .map_err(|e| failure(Some(&sheet), e.into()))?;
            model
                .update_turn_sheet(&locked)
                .await
                .map_err(|e| failure(Some(&sheet), e.into()))?;
            summary.sheets_processed += 1;
        }
        Ok(())
    }

    /// Print the current turn's sheets for every character in the instance.
    pub async fn create_next_sheets(
        &self,
        model: &mut Model,
        game: &Game,
        instance: &GameInstance,
    ) -> Result<Vec<GameTurnSheet>, TurnProcessingError> {
        let mut created = Vec::new();
        for character in model.list_character_instances(instance.id()).await? {
            created.extend(
                self.create_character_sheets(model, game, instance, &character)
                    .await?,
            );
        }
        Ok(created)
    }

    /// One sheet per sheet type, unless the character already has this turn's sheets.
    pub async fn create_character_sheets(
        &self,
        model: &mut Model,
        game: &Game,
        instance: &GameInstance,
        character: &CharacterInstance,
    ) -> Result<Vec<GameTurnSheet>, TurnProcessingError> {
        if !model
            .list_character_turn_sheets(character.id, instance.current_turn())
            .await?
            .is_empty()
        {
            return Ok(Vec::new());
        }

        let owner = model.get_character_for_instance(character).await?;
        let account = model.get_account(owner.account_id).await?;
        let user = model.get_primary_account_user(account.id).await?;
        let recipient = SheetRecipient {
            character: owner,
            account,
            user,
        };
        let ctx = SheetContext {
            game,
            instance,
            recipient: &recipient,
        };

        let mut created = Vec::new();
        for processor in self.processors.in_order() {
            let sheet = processor
                .create_next_turn_sheet(model, ctx, character)
                .await
                .map_err(|source| TurnProcessingError::SheetGeneration {
                    character_instance_id: character.id,
                    source,
                })?;
            created.push(sheet);
        }

        tracing::debug!(
            character_instance_id = %character.id,
            turn_number = instance.current_turn(),
            sheets = created.len(),
            "Turn sheets created"
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use playbymail_domain::{LocationChoiceSheetData, SheetType};

    use crate::test_fixtures::{offline_services, test_db, WorldBuilder};

    use super::*;

    #[tokio::test]
    async fn sheets_are_created_once_per_turn_in_processing_order() {
        let db = test_db().await;
        let mut model = db.model().await;
        let world = WorldBuilder::new("Caves").with_players(2).seed(&mut model).await;
        let adventure = AdventureGame::new(Arc::new(TurnSheetProcessors::new(offline_services())));

        let sheets = adventure
            .create_next_sheets(&mut model, &world.game, &world.instance)
            .await
            .unwrap();
        let types: Vec<_> = sheets.iter().map(|s| s.sheet_type()).collect();
        assert_eq!(
            types,
            vec![
                SheetType::InventoryManagement,
                SheetType::LocationChoice,
                SheetType::InventoryManagement,
                SheetType::LocationChoice,
            ]
        );

        let again = adventure
            .create_next_sheets(&mut model, &world.game, &world.instance)
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn unreturned_sheets_are_skipped() {
        let db = test_db().await;
        let mut model = db.model().await;
        let world = WorldBuilder::new("Caves").with_players(1).seed(&mut model).await;
        let adventure = AdventureGame::new(Arc::new(TurnSheetProcessors::new(offline_services())));
        adventure
            .create_next_sheets(&mut model, &world.game, &world.instance)
            .await
            .unwrap();

        let summary = adventure
            .process_responses(&mut model, &world.instance)
            .await
            .unwrap();
        assert_eq!(summary.sheets_processed, 0);
        assert_eq!(summary.sheets_unreturned, 2);
    }

    #[tokio::test]
    async fn scanned_move_is_applied_and_sheet_completed() {
        let db = test_db().await;
        let mut model = db.model().await;
        let world = WorldBuilder::new("Caves").with_players(1).seed(&mut model).await;
        let player = &world.characters[0];
        let adventure = AdventureGame::new(Arc::new(TurnSheetProcessors::new(offline_services())));
        let sheets = adventure
            .create_next_sheets(&mut model, &world.game, &world.instance)
            .await
            .unwrap();

        let mut sheet = sheets
            .into_iter()
            .find(|s| s.sheet_type() == SheetType::LocationChoice)
            .unwrap();
        let data: LocationChoiceSheetData =
            serde_json::from_value(sheet.sheet_data().clone()).unwrap();
        let target = data.location_options[0].location_id;
        let now = model.now();
        sheet
            .record_scan(json!({ "choices": [target] }), now)
            .unwrap();
        model.update_turn_sheet(&sheet).await.unwrap();

        let summary = adventure
            .process_responses(&mut model, &world.instance)
            .await
            .unwrap();
        assert_eq!(summary.sheets_processed, 1);

        let moved = model.get_character_instance(player.instance.id).await.unwrap();
        assert_eq!(moved.current_location_instance_id, target);
        assert!(model.get_turn_sheet(sheet.id()).await.unwrap().is_completed());
    }
}
