//! Turn sheet processing errors.

use playbymail_domain::{DomainError, GameTurnSheetId, SheetType};

use crate::infrastructure::ports::{ExtractionError, RenderError, RepoError};
use crate::infrastructure::resilient_extraction::is_retryable;

/// Errors from generating, scanning or applying a turn sheet.
#[derive(Debug, thiserror::Error)]
pub enum TurnSheetError {
    #[error("Invalid scan data: {0}")]
    InvalidScanData(String),
    #[error("Invalid choice: {0}")]
    InvalidChoice(String),
    #[error("Unsupported sheet type: {0}")]
    UnsupportedSheetType(String),
    #[error("{expected} processor was given a {actual} sheet")]
    WrongSheetType {
        expected: SheetType,
        actual: SheetType,
    },
    #[error("Invalid sheet data: {0}")]
    InvalidSheetData(String),
    #[error("Turn sheet {0} is already completed")]
    AlreadyCompleted(GameTurnSheetId),
    #[error("Turn sheet {0} belongs to a turn that is no longer open")]
    SheetSuperseded(GameTurnSheetId),
    #[error("Turn sheet code does not match sheet {0}")]
    CodeMismatch(GameTurnSheetId),
    #[error("Turn sheet code error: {0}")]
    Code(String),
    #[error("Domain error: {0}")]
    Domain(DomainError),
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl From<DomainError> for TurnSheetError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InvalidScanData(msg) => Self::InvalidScanData(msg),
            DomainError::InvalidChoice(msg) => Self::InvalidChoice(msg),
            DomainError::UnsupportedType(msg) => Self::UnsupportedSheetType(msg),
            other => Self::Domain(other),
        }
    }
}

impl TurnSheetError {
    pub fn invalid_scan_data(msg: impl Into<String>) -> Self {
        Self::InvalidScanData(msg.into())
    }

    pub fn invalid_choice(msg: impl Into<String>) -> Self {
        Self::InvalidChoice(msg.into())
    }

    pub fn invalid_sheet_data(msg: impl Into<String>) -> Self {
        Self::InvalidSheetData(msg.into())
    }

    /// Worth trying again later with the same input.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Extraction(e) => is_retryable(e),
            Self::Render(RenderError::RequestFailed(_)) => true,
            Self::Render(RenderError::Http { status, .. }) => *status >= 500,
            Self::Repo(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Caused by what the player marked on the sheet.
    pub fn is_player_input_error(&self) -> bool {
        matches!(self, Self::InvalidScanData(_) | Self::InvalidChoice(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_input_errors_keep_their_kind() {
        let err: TurnSheetError = DomainError::invalid_choice("location D").into();
        assert!(matches!(err, TurnSheetError::InvalidChoice(_)));
        assert!(err.is_player_input_error());

        let err: TurnSheetError = DomainError::unsupported_type("combat").into();
        assert!(matches!(err, TurnSheetError::UnsupportedSheetType(_)));
    }

    #[test]
    fn busy_database_is_transient() {
        assert!(TurnSheetError::Repo(RepoError::Busy {
            operation: "lock_row",
            message: "database is locked".into(),
        })
        .is_transient());
        assert!(!TurnSheetError::invalid_choice("x").is_transient());
    }

    #[test]
    fn superseded_sheets_are_neither_retried_nor_blamed_on_the_player() {
        let err = TurnSheetError::SheetSuperseded(GameTurnSheetId::new());
        assert!(!err.is_transient());
        assert!(!err.is_player_input_error());
    }
}
