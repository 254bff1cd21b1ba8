//! GameInstance aggregate - one live play of a game
//!
//! The instance owns the turn counter and the lifecycle that the turn pipeline
//! drives:
//!
//! ```text
//! created -> started -> processing -> started -> ... -> completed | cancelled
//!               \-> paused -> started
//! ```
//!
//! Every transition takes `now` so callers control time (see `ClockPort` in the
//! engine).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::value_objects::GameConfig;
use crate::{DomainError, GameId, GameInstanceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameInstanceStatus {
    Created,
    Started,
    Processing,
    Paused,
    Completed,
    Cancelled,
}

impl GameInstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameInstanceStatus::Created => "created",
            GameInstanceStatus::Started => "started",
            GameInstanceStatus::Processing => "processing",
            GameInstanceStatus::Paused => "paused",
            GameInstanceStatus::Completed => "completed",
            GameInstanceStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GameInstanceStatus::Completed | GameInstanceStatus::Cancelled)
    }
}

impl fmt::Display for GameInstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameInstanceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(GameInstanceStatus::Created),
            "started" => Ok(GameInstanceStatus::Started),
            "processing" => Ok(GameInstanceStatus::Processing),
            "paused" => Ok(GameInstanceStatus::Paused),
            "completed" => Ok(GameInstanceStatus::Completed),
            "cancelled" => Ok(GameInstanceStatus::Cancelled),
            other => Err(DomainError::parse(format!(
                "unknown game instance status: {}",
                other
            ))),
        }
    }
}

/// A running play of a [`crate::Game`].
///
/// # Invariants
///
/// - `current_turn` never decreases
/// - `next_turn_due_at` is set only while the instance is scheduled
///   (`started` or `processing`)
/// - `completed_at` is set only for terminal instances
#[derive(Debug, Clone, PartialEq)]
pub struct GameInstance {
    id: GameInstanceId,
    game_id: GameId,
    status: GameInstanceStatus,
    current_turn: i32,
    last_turn_processed_at: Option<DateTime<Utc>>,
    next_turn_due_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    game_config: GameConfig,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GameInstance {
    // =========================================================================
    // Constructor
    // =========================================================================

    pub fn new(game_id: GameId, game_config: GameConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: GameInstanceId::new(),
            game_id,
            status: GameInstanceStatus::Created,
            current_turn: 0,
            last_turn_processed_at: None,
            next_turn_due_at: None,
            started_at: None,
            completed_at: None,
            game_config,
            created_at: now,
            updated_at: now,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> GameInstanceId {
        self.id
    }

    #[inline]
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    #[inline]
    pub fn status(&self) -> GameInstanceStatus {
        self.status
    }

    #[inline]
    pub fn current_turn(&self) -> i32 {
        self.current_turn
    }

    #[inline]
    pub fn last_turn_processed_at(&self) -> Option<DateTime<Utc>> {
        self.last_turn_processed_at
    }

    #[inline]
    pub fn next_turn_due_at(&self) -> Option<DateTime<Utc>> {
        self.next_turn_due_at
    }

    #[inline]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[inline]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[inline]
    pub fn game_config(&self) -> &GameConfig {
        &self.game_config
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// A started instance whose deadline has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == GameInstanceStatus::Started
            && self.next_turn_due_at.is_some_and(|due| due <= now)
    }

    // =========================================================================
    // Builder Methods (for reconstitution from storage)
    // =========================================================================

    pub fn with_id(mut self, id: GameInstanceId) -> Self {
        self.id = id;
        self
    }

    pub fn with_status(mut self, status: GameInstanceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_current_turn(mut self, current_turn: i32) -> Self {
        self.current_turn = current_turn;
        self
    }

    pub fn with_last_turn_processed_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_turn_processed_at = at;
        self
    }

    pub fn with_next_turn_due_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.next_turn_due_at = at;
        self
    }

    pub fn with_started_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.started_at = at;
        self
    }

    pub fn with_completed_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.completed_at = at;
        self
    }

    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn require(&self, expected: GameInstanceStatus, action: &str) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(DomainError::conflicting_state(format!(
                "cannot {} game instance {}: status is {}, expected {}",
                action, self.id, self.status, expected
            )));
        }
        Ok(())
    }

    /// When a turn starting at `now` is due.
    fn due_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, DomainError> {
        now.checked_add_signed(self.game_config.turn_period())
            .ok_or_else(|| {
                DomainError::constraint(format!(
                    "turn deadline for game instance {} is out of range",
                    self.id
                ))
            })
    }

    /// created -> started. Turn 1 begins and is due one turn period from now.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.require(GameInstanceStatus::Created, "start")?;
        let due = self.due_after(now)?;
        self.status = GameInstanceStatus::Started;
        self.current_turn = self.current_turn.max(1);
        self.started_at = Some(now);
        self.next_turn_due_at = Some(due);
        self.updated_at = now;
        Ok(())
    }

    /// started -> processing.
    pub fn begin_turn_processing(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.require(GameInstanceStatus::Started, "begin turn processing for")?;
        self.status = GameInstanceStatus::Processing;
        self.last_turn_processed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// processing -> started, advancing the turn and rescheduling the deadline.
    pub fn complete_turn(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.require(GameInstanceStatus::Processing, "complete turn for")?;
        let due = self.due_after(now)?;
        self.current_turn += 1;
        self.status = GameInstanceStatus::Started;
        self.next_turn_due_at = Some(due);
        self.updated_at = now;
        Ok(())
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.require(GameInstanceStatus::Started, "pause")?;
        self.status = GameInstanceStatus::Paused;
        self.next_turn_due_at = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.require(GameInstanceStatus::Paused, "resume")?;
        let due = self.due_after(now)?;
        self.status = GameInstanceStatus::Started;
        self.next_turn_due_at = Some(due);
        self.updated_at = now;
        Ok(())
    }

    /// Ends the game normally. Not allowed mid-turn.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.finish(GameInstanceStatus::Completed, "complete", now)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.finish(GameInstanceStatus::Cancelled, "cancel", now)
    }

    fn finish(
        &mut self,
        terminal: GameInstanceStatus,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status.is_terminal() || self.status == GameInstanceStatus::Processing {
            return Err(DomainError::conflicting_state(format!(
                "cannot {} game instance {}: status is {}",
                action, self.id, self.status
            )));
        }
        self.status = terminal;
        self.next_turn_due_at = None;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
