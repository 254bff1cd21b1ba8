//! GameTurnSheet aggregate - one document for one player, one turn, one sheet type
//!
//! A sheet is written once at creation, then mutated by a scan (possibly more
//! than once, a re-scan replaces the previous reading) and finally by response
//! processing. Once completed it never changes again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::value_objects::SheetType;
use crate::{AccountId, DomainError, GameId, GameInstanceId, GameTurnSheetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Scanned,
    Processed,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Scanned => "scanned",
            ProcessingStatus::Processed => "processed",
            ProcessingStatus::Error => "error",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "scanned" => Ok(ProcessingStatus::Scanned),
            "processed" => Ok(ProcessingStatus::Processed),
            "error" => Ok(ProcessingStatus::Error),
            other => Err(DomainError::parse(format!(
                "unknown processing status: {}",
                other
            ))),
        }
    }
}

/// # Invariants
///
/// - `is_completed` implies `scanned_data` is present
/// - a completed sheet rejects every further mutation
#[derive(Debug, Clone, PartialEq)]
pub struct GameTurnSheet {
    id: GameTurnSheetId,
    game_id: GameId,
    game_instance_id: GameInstanceId,
    account_id: AccountId,
    turn_number: i32,
    sheet_type: SheetType,
    sheet_order: i32,
    sheet_data: Value,
    scanned_data: Option<Value>,
    scanned_at: Option<DateTime<Utc>>,
    processing_status: ProcessingStatus,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GameTurnSheet {
    pub fn new(
        game_id: GameId,
        game_instance_id: GameInstanceId,
        account_id: AccountId,
        turn_number: i32,
        sheet_type: SheetType,
        sheet_data: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: GameTurnSheetId::new(),
            game_id,
            game_instance_id,
            account_id,
            turn_number,
            sheet_type,
            sheet_order: sheet_type.sheet_order(),
            sheet_data,
            scanned_data: None,
            scanned_at: None,
            processing_status: ProcessingStatus::Pending,
            is_completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> GameTurnSheetId {
        self.id
    }

    #[inline]
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    #[inline]
    pub fn game_instance_id(&self) -> GameInstanceId {
        self.game_instance_id
    }

    #[inline]
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    #[inline]
    pub fn turn_number(&self) -> i32 {
        self.turn_number
    }

    #[inline]
    pub fn sheet_type(&self) -> SheetType {
        self.sheet_type
    }

    #[inline]
    pub fn sheet_order(&self) -> i32 {
        self.sheet_order
    }

    #[inline]
    pub fn sheet_data(&self) -> &Value {
        &self.sheet_data
    }

    #[inline]
    pub fn scanned_data(&self) -> Option<&Value> {
        self.scanned_data.as_ref()
    }

    #[inline]
    pub fn scanned_at(&self) -> Option<DateTime<Utc>> {
        self.scanned_at
    }

    #[inline]
    pub fn processing_status(&self) -> ProcessingStatus {
        self.processing_status
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[inline]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // =========================================================================
    // Builder Methods (for reconstitution from storage)
    // =========================================================================

    pub fn with_id(mut self, id: GameTurnSheetId) -> Self {
        self.id = id;
        self
    }

    pub fn with_sheet_order(mut self, sheet_order: i32) -> Self {
        self.sheet_order = sheet_order;
        self
    }

    pub fn with_scan(mut self, scanned_data: Option<Value>, scanned_at: Option<DateTime<Utc>>) -> Self {
        self.scanned_data = scanned_data;
        self.scanned_at = scanned_at;
        self
    }

    pub fn with_processing_status(mut self, status: ProcessingStatus) -> Self {
        self.processing_status = status;
        self
    }

    pub fn with_completion(mut self, is_completed: bool, completed_at: Option<DateTime<Utc>>) -> Self {
        self.is_completed = is_completed;
        self.completed_at = completed_at;
        self
    }

    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn ensure_open(&self, action: &str) -> Result<(), DomainError> {
        if self.is_completed {
            return Err(DomainError::conflicting_state(format!(
                "cannot {} turn sheet {}: already completed",
                action, self.id
            )));
        }
        Ok(())
    }

    /// Store a scanned response. Replaces any earlier scan of the same sheet.
    pub fn record_scan(&mut self, scanned_data: Value, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_open("record a scan on")?;
        self.scanned_data = Some(scanned_data);
        self.scanned_at = Some(now);
        self.processing_status = ProcessingStatus::Scanned;
        self.updated_at = now;
        Ok(())
    }

    /// Flag a scan that could not be accepted, so operators can see it.
    pub fn mark_scan_failed(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_open("mark scan failure on")?;
        self.processing_status = ProcessingStatus::Error;
        self.updated_at = now;
        Ok(())
    }

    /// The scanned response has been applied to game state.
    pub fn mark_processed(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_open("complete")?;
        if self.scanned_data.is_none() {
            return Err(DomainError::conflicting_state(format!(
                "cannot complete turn sheet {}: nothing has been scanned",
                self.id
            )));
        }
        self.is_completed = true;
        self.completed_at = Some(now);
        self.processing_status = ProcessingStatus::Processed;
        self.updated_at = now;
        Ok(())
    }
}
