use serde::{Deserialize, Serialize};

use crate::{AdventureGameTurnSheetId, CharacterInstanceId, GameId, GameTurnSheetId};

/// Links a generic [`crate::GameTurnSheet`] to the adventure character it was made for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdventureGameTurnSheet {
    pub id: AdventureGameTurnSheetId,
    pub game_id: GameId,
    pub character_instance_id: CharacterInstanceId,
    pub game_turn_sheet_id: GameTurnSheetId,
}

impl AdventureGameTurnSheet {
    pub fn new(
        game_id: GameId,
        character_instance_id: CharacterInstanceId,
        game_turn_sheet_id: GameTurnSheetId,
    ) -> Self {
        Self {
            id: AdventureGameTurnSheetId::new(),
            game_id,
            character_instance_id,
            game_turn_sheet_id,
        }
    }
}
