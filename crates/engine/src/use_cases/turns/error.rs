//! Turn processing errors.

use std::fmt;

use playbymail_domain::{CharacterInstanceId, DomainError, GameInstanceId, GameTurnSheetId};

use crate::infrastructure::ports::{QueueError, RepoError};
use crate::infrastructure::queue::JobError;
use crate::use_cases::turn_sheets::TurnSheetError;

/// One character whose sheets could not be applied.
#[derive(Debug)]
pub struct CharacterFailure {
    pub character_instance_id: CharacterInstanceId,
    pub game_turn_sheet_id: Option<GameTurnSheetId>,
    pub error: TurnSheetError,
}

impl fmt::Display for CharacterFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.game_turn_sheet_id {
            Some(sheet) => write!(
                f,
                "character {} sheet {}: {}",
                self.character_instance_id, sheet, self.error
            ),
            None => write!(f, "character {}: {}", self.character_instance_id, self.error),
        }
    }
}

fn summarize(failures: &[CharacterFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum TurnProcessingError {
    #[error("Turn number mismatch for game instance {game_instance_id}: job is for turn {job_turn}, instance is on turn {current_turn}")]
    TurnNumberMismatch {
        game_instance_id: GameInstanceId,
        job_turn: i32,
        current_turn: i32,
    },
    #[error("Conflicting state: {0}")]
    ConflictingState(String),
    #[error("Unsupported game type: {0}")]
    UnsupportedGameType(String),
    #[error("{} character(s) failed: {}", .0.len(), summarize(.0))]
    CharacterFailures(Vec<CharacterFailure>),
    #[error("Sheet generation failed for character {character_instance_id}: {source}")]
    SheetGeneration {
        character_instance_id: CharacterInstanceId,
        #[source]
        source: TurnSheetError,
    },
    #[error("Domain error: {0}")]
    Domain(DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl From<DomainError> for TurnProcessingError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::ConflictingState(msg) => Self::ConflictingState(msg),
            DomainError::UnsupportedType(msg) => Self::UnsupportedGameType(msg),
            other => Self::Domain(other),
        }
    }
}

impl TurnProcessingError {
    /// Stale duplicates, illegal states, unknown game types and vanished
    /// instances never fix themselves.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::TurnNumberMismatch { .. }
            | Self::ConflictingState(_)
            | Self::UnsupportedGameType(_) => true,
            Self::Repo(e) => e.is_not_found(),
            _ => false,
        }
    }
}

impl From<TurnProcessingError> for JobError {
    fn from(error: TurnProcessingError) -> Self {
        if error.is_permanent() {
            JobError::permanent(error.to_string())
        } else {
            JobError::retryable(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_jobs_are_permanent_failures() {
        let err = TurnProcessingError::TurnNumberMismatch {
            game_instance_id: GameInstanceId::new(),
            job_turn: 3,
            current_turn: 4,
        };
        assert!(JobError::from(err).is_permanent());

        let err: TurnProcessingError = DomainError::conflicting_state("processing").into();
        assert!(matches!(err, TurnProcessingError::ConflictingState(_)));
        assert!(err.is_permanent());
    }

    #[test]
    fn character_failures_are_listed_and_retried() {
        let err = TurnProcessingError::CharacterFailures(vec![CharacterFailure {
            character_instance_id: CharacterInstanceId::new(),
            game_turn_sheet_id: None,
            error: TurnSheetError::invalid_choice("location D"),
        }]);
        assert!(err.to_string().starts_with("1 character(s) failed: character "));
        assert!(err.to_string().contains("location D"));
        assert!(!JobError::from(err).is_permanent());
    }
}
