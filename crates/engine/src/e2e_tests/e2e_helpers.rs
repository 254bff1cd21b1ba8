//! E2E test helpers for constructing the full application stack.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use playbymail_domain::{
    CharacterInstance, CharacterInstanceId, GameInstance, GameInstanceId, GameTurnSheet,
    LocationInstanceId, SheetType,
};

use crate::app::App;
use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::{
    EmailError, EmailMessage, EmailPort, ImageExtractionPort, MockImageExtractionPort,
};
use crate::infrastructure::queue::{
    JobArgs, JobRecord, RunnerConfig, QUEUE_DEFAULT, QUEUE_GAME,
};
use crate::infrastructure::turn_sheet_code::TurnSheetCodec;
use crate::queue_types::QueueGameTurnProcessing;
use crate::test_fixtures::{test_db, SeededWorld, StubRenderer, TestDb, WorldBuilder, TEST_CODE_KEY};
use crate::use_cases::turn_sheets::{SheetContext, TurnSheetProcessors};

/// Upper bound on jobs run by one drain, so a bug cannot spin a test forever.
const MAX_JOBS_PER_DRAIN: usize = 50;

// =============================================================================
// Recording email adapter
// =============================================================================

#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmailSender {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailPort for RecordingEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// =============================================================================
// E2ETestContext
// =============================================================================

/// A fully wired engine on a throwaway database.
pub struct E2ETestContext {
    pub db: TestDb,
    pub app: App,
    pub emails: Arc<RecordingEmailSender>,
}

impl E2ETestContext {
    /// Context whose extractor fails the test if it is ever called.
    pub async fn setup() -> Self {
        Self::setup_with_extractor(Arc::new(MockImageExtractionPort::new())).await
    }

    pub async fn setup_with_extractor(extractor: Arc<dyn ImageExtractionPort>) -> Self {
        let db = test_db().await;
        let emails = Arc::new(RecordingEmailSender::default());
        let app = App::new(
            db.pool.clone(),
            db.clock(),
            Arc::new(StubRenderer),
            extractor,
            emails.clone(),
            TurnSheetCodec::new(TEST_CODE_KEY),
        );
        Self { db, app, emails }
    }

    pub async fn model(&self) -> Model {
        self.db.model().await
    }

    // -------------------------------------------------------------------------
    // Seeding
    // -------------------------------------------------------------------------

    /// Seed a started world whose current turn is `turn` and overdue by a minute.
    pub async fn seed_due_world(&self, players: usize, turn: i32) -> SeededWorld {
        let mut model = self.model().await;
        let mut world = WorldBuilder::new("Caves")
            .with_players(players)
            .seed(&mut model)
            .await;
        let now = model.now();
        world.instance = world
            .instance
            .clone()
            .with_current_turn(turn)
            .with_next_turn_due_at(Some(now - Duration::minutes(1)));
        model.update_game_instance(&world.instance).await.unwrap();
        model.commit().await.unwrap();
        world
    }

    /// One `location_choice` sheet per character for the current turn.
    pub async fn create_location_sheets(&self, world: &SeededWorld) -> Vec<GameTurnSheet> {
        let mut model = self.model().await;
        let processors = self.processors();
        let mut sheets = Vec::new();
        for player in &world.characters {
            let recipient = player.recipient();
            let ctx = SheetContext {
                game: &world.game,
                instance: &world.instance,
                recipient: &recipient,
            };
            let sheet = processors
                .get(SheetType::LocationChoice)
                .create_next_turn_sheet(&mut model, ctx, &player.instance)
                .await
                .unwrap();
            sheets.push(sheet);
        }
        model.commit().await.unwrap();
        sheets
    }

    /// Store a scan as if the player had marked `destination`.
    pub async fn record_choice(&self, sheet: &GameTurnSheet, destination: LocationInstanceId) {
        let mut model = self.model().await;
        let mut sheet = model.get_turn_sheet(sheet.id()).await.unwrap();
        let now = model.now();
        sheet
            .record_scan(json!({ "choices": [destination] }), now)
            .unwrap();
        model.update_turn_sheet(&sheet).await.unwrap();
        model.commit().await.unwrap();
    }

    pub async fn location(&self, world: &SeededWorld, name: &str) -> LocationInstanceId {
        let mut model = self.model().await;
        world.location(&mut model, name).await.id
    }

    /// Make the instance's deadline pass without touching anything else.
    pub async fn make_due(&self, id: GameInstanceId) {
        let mut model = self.model().await;
        let now = model.now();
        let instance = model
            .get_game_instance(id)
            .await
            .unwrap()
            .with_next_turn_due_at(Some(now - Duration::minutes(1)));
        model.update_game_instance(&instance).await.unwrap();
        model.commit().await.unwrap();
    }

    fn processors(&self) -> TurnSheetProcessors {
        TurnSheetProcessors::new(Arc::clone(&self.app.services))
    }

    // -------------------------------------------------------------------------
    // Running jobs
    // -------------------------------------------------------------------------

    /// Run one job from `queue`. False when nothing was due.
    pub async fn run_job(&self, queue: &'static str) -> bool {
        self.app
            .runner(RunnerConfig::new(queue), CancellationToken::new())
            .run_once()
            .await
            .unwrap()
    }

    /// Run jobs from `queue` until none are due. Returns how many ran.
    pub async fn drain(&self, queue: &'static str) -> usize {
        let mut ran = 0;
        while ran < MAX_JOBS_PER_DRAIN && self.run_job(queue).await {
            ran += 1;
        }
        ran
    }

    /// One scheduler tick: the periodic job runs, then every turn job it enqueued.
    pub async fn tick(&self) -> usize {
        self.app
            .queue
            .insert(&QueueGameTurnProcessing::default())
            .await
            .unwrap();
        self.drain(QUEUE_GAME).await
    }

    pub async fn drain_default(&self) -> usize {
        self.drain(QUEUE_DEFAULT).await
    }

    pub async fn jobs<A: JobArgs>(&self) -> Vec<JobRecord> {
        self.app.queue.list_by_kind(A::KIND).await.unwrap()
    }

    // -------------------------------------------------------------------------
    // Reading state
    // -------------------------------------------------------------------------

    pub async fn instance(&self, id: GameInstanceId) -> GameInstance {
        let mut model = self.model().await;
        model.get_game_instance(id).await.unwrap()
    }

    pub async fn character(&self, id: CharacterInstanceId) -> CharacterInstance {
        let mut model = self.model().await;
        model.get_character_instance(id).await.unwrap()
    }

    pub async fn sheets(&self, character: CharacterInstanceId, turn: i32) -> Vec<GameTurnSheet> {
        let mut model = self.model().await;
        model.list_character_turn_sheets(character, turn).await.unwrap()
    }

    /// Item instances whose placement columns do not name exactly one owner.
    pub async fn misplaced_items(&self) -> i64 {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM adventure_game_item_instance
            WHERE (adventure_game_location_instance_id IS NOT NULL)
                + (adventure_game_character_instance_id IS NOT NULL)
                + (adventure_game_creature_instance_id IS NOT NULL) != 1
            "#,
        )
        .fetch_one(&self.db.pool)
        .await
        .unwrap()
    }
}

/// The printed code on a stored sheet.
pub fn sheet_code(sheet: &GameTurnSheet) -> String {
    sheet.sheet_data()["turn_sheet_code"]
        .as_str()
        .expect("sheet has a code")
        .to_string()
}
