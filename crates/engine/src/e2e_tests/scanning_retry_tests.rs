//! E2E tests for scanning through the real OpenAI client against a fake server.
//!
//! Tests verify:
//! - Rate limits are retried until the extraction succeeds
//! - In-band refusals are retried the same way
//! - Errors that cannot improve fail on the first attempt

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use serde_json::json;

use playbymail_domain::{GameTurnSheet, LocationInstanceId, ProcessingStatus};

use crate::infrastructure::ports::ExtractionError;
use crate::test_fixtures::tiny_png;
use crate::use_cases::turn_sheets::TurnSheetError;

use super::{output_text, rate_limited, sheet_code, E2ETestContext, FakeOpenAi};

const REFUSAL: &str = "I'm sorry, but I can't help with that.";

struct Scenario {
    ctx: E2ETestContext,
    fake: FakeOpenAi,
    sheet: GameTurnSheet,
    cellar: LocationInstanceId,
    vault: LocationInstanceId,
}

async fn scenario() -> Scenario {
    let fake = FakeOpenAi::start().await;
    let ctx = E2ETestContext::setup_with_extractor(fake.extractor()).await;
    let world = ctx.seed_due_world(1, 1).await;
    let sheet = ctx.create_location_sheets(&world).await.remove(0);
    let cellar = ctx.location(&world, "Cellar").await;
    let vault = ctx.location(&world, "Vault").await;
    Scenario {
        ctx,
        fake,
        sheet,
        cellar,
        vault,
    }
}

impl Scenario {
    fn answer(&self) -> (StatusCode, serde_json::Value) {
        output_text(&json!({ "choices": [self.cellar] }).to_string())
    }

    /// Upload with the code typed in, so only the structured extraction is called.
    async fn upload(&self) -> Result<GameTurnSheet, TurnSheetError> {
        self.ctx
            .app
            .use_cases
            .scan_upload
            .execute(&tiny_png(), Some(&sheet_code(&self.sheet)))
            .await
    }
}

#[tokio::test]
async fn rate_limited_extraction_is_retried_until_it_succeeds() {
    let s = scenario().await;
    s.fake
        .respond_with(vec![rate_limited(), rate_limited(), s.answer()]);

    let started = Instant::now();
    let scanned = s.upload().await.unwrap();

    assert_eq!(s.fake.calls(), 3);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(scanned.processing_status(), ProcessingStatus::Scanned);
    assert_eq!(scanned.scanned_data(), Some(&json!({ "choices": [s.cellar] })));
}

#[tokio::test]
async fn refusals_are_retried_until_the_model_answers() {
    let s = scenario().await;
    let mut replies = vec![output_text(REFUSAL); 4];
    replies.push(s.answer());
    s.fake.respond_with(replies);

    let scanned = s.upload().await.unwrap();

    assert_eq!(s.fake.calls(), 5);
    assert_eq!(scanned.processing_status(), ProcessingStatus::Scanned);

    let mut model = s.ctx.model().await;
    let stored = model.get_turn_sheet(s.sheet.id()).await.unwrap();
    assert_eq!(stored.scanned_data(), Some(&json!({ "choices": [s.cellar] })));
}

#[tokio::test]
async fn a_rejected_api_key_is_not_retried() {
    let s = scenario().await;
    s.fake.respond_with(vec![(
        StatusCode::UNAUTHORIZED,
        json!({ "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" } }),
    )]);

    let err = s.upload().await.unwrap_err();

    assert!(matches!(
        err,
        TurnSheetError::Extraction(ExtractionError::Http { status: 401, .. })
    ));
    assert_eq!(s.fake.calls(), 1);

    let mut model = s.ctx.model().await;
    let stored = model.get_turn_sheet(s.sheet.id()).await.unwrap();
    assert_eq!(stored.processing_status(), ProcessingStatus::Pending);
    assert!(stored.scanned_data().is_none());
}

#[tokio::test]
async fn an_answer_naming_an_unoffered_path_marks_the_sheet() {
    let s = scenario().await;
    s.fake.respond_with(vec![output_text(
        &json!({ "choices": [s.vault] }).to_string(),
    )]);

    let err = s.upload().await.unwrap_err();

    assert!(err.is_player_input_error());
    let mut model = s.ctx.model().await;
    let stored = model.get_turn_sheet(s.sheet.id()).await.unwrap();
    assert_eq!(stored.processing_status(), ProcessingStatus::Error);
}
