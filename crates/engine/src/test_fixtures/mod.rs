//! Shared test helpers: a throwaway SQLite database, offline sheet services and
//! a small seeded adventure world.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{test_db, WorldBuilder};
//!
//! #[tokio::test]
//! async fn test_with_caves() {
//!     let db = test_db().await;
//!     let mut model = db.model().await;
//!     let world = WorldBuilder::new("Caves").with_players(1).seed(&mut model).await;
//!     // ... test logic
//! }
//! ```

pub mod world_seeder;

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::infrastructure::clock::FixedClock;
use crate::infrastructure::persistence::{connect, ConnectionSettings, Model};
use crate::infrastructure::ports::{
    ClockPort, DocumentRendererPort, MockImageExtractionPort, RenderError,
};
use crate::infrastructure::queue::SqliteJobQueue;
use crate::infrastructure::turn_sheet_code::TurnSheetCodec;
use crate::use_cases::turn_sheets::TurnSheetServices;

pub use world_seeder::{SeededCharacter, SeededWorld, WorldBuilder};

/// Key used for every turn sheet code minted in tests.
pub const TEST_CODE_KEY: &str = "test-turn-sheet-key";

/// The instant every test clock is frozen at.
pub fn test_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .expect("valid test time")
}

// =============================================================================
// Database
// =============================================================================

/// A file-backed SQLite database that lives as long as this value.
///
/// File-backed rather than `:memory:` so several pool connections see the same
/// data, which the transactional job paths rely on.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl TestDb {
    pub fn clock(&self) -> Arc<dyn ClockPort> {
        Arc::new(FixedClock(test_time()))
    }

    /// Open a transaction. Tests that want their writes visible elsewhere must commit.
    pub async fn model(&self) -> Model {
        Model::begin(&self.pool, self.clock())
            .await
            .expect("begin transaction")
    }

    pub fn queue(&self) -> SqliteJobQueue {
        SqliteJobQueue::new(self.pool.clone(), self.clock())
    }
}

pub async fn test_db() -> TestDb {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("playbymail.db").display());
    let pool = connect(&ConnectionSettings::new(url))
        .await
        .expect("connect test database");
    TestDb { pool, _dir: dir }
}

// =============================================================================
// Sheet services
// =============================================================================

pub const STUB_PDF: &[u8] = b"%PDF-1.7 stub";

/// A real 8x8 PNG, small enough to pass image preparation untouched.
pub fn tiny_png() -> Vec<u8> {
    let img = ImageBuffer::from_pixel(8, 8, Rgb([250u8, 250, 240]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode png");
    buffer.into_inner()
}

/// Renderer that answers instantly: fixed PDF bytes and a tiny blank PNG.
pub struct StubRenderer;

#[async_trait]
impl DocumentRendererPort for StubRenderer {
    async fn render_pdf(&self, _html: &str) -> Result<Vec<u8>, RenderError> {
        Ok(STUB_PDF.to_vec())
    }

    async fn render_png(&self, _html: &str) -> Result<Vec<u8>, RenderError> {
        Ok(tiny_png())
    }
}

pub fn services_with(extractor: MockImageExtractionPort) -> Arc<TurnSheetServices> {
    Arc::new(TurnSheetServices::new(
        Arc::new(StubRenderer),
        Arc::new(extractor),
        TurnSheetCodec::new(TEST_CODE_KEY),
    ))
}

/// Services for tests that never scan. Any extraction call fails the test.
pub fn offline_services() -> Arc<TurnSheetServices> {
    services_with(MockImageExtractionPort::new())
}
