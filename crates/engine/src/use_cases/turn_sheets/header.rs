//! Header fields shared by every turn sheet.

use playbymail_domain::{GameTurnSheetId, TurnSheetHeader};

use super::processor::SheetContext;
use crate::infrastructure::turn_sheet_code::{TurnSheetCodeParts, TurnSheetCodec};

pub(super) fn build_header(
    codec: &TurnSheetCodec,
    ctx: SheetContext<'_>,
    sheet_id: GameTurnSheetId,
) -> TurnSheetHeader {
    let code = codec.encode(&TurnSheetCodeParts {
        game_id: ctx.game.id,
        game_instance_id: ctx.instance.id(),
        account_id: ctx.recipient.account.id,
        game_turn_sheet_id: sheet_id,
    });

    TurnSheetHeader {
        game_name: ctx.game.name.clone(),
        game_type: ctx.game.game_type.clone(),
        turn_number: ctx.instance.current_turn(),
        account_name: ctx.recipient.account.name.clone(),
        account_email: ctx.recipient.user.email.clone(),
        turn_sheet_title: String::new(),
        turn_sheet_description: String::new(),
        turn_sheet_instructions: String::new(),
        turn_sheet_deadline: ctx.instance.next_turn_due_at(),
        turn_sheet_code: code,
    }
}
