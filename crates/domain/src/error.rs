//! Unified error types for the domain layer
//!
//! Every domain rule reports through [`DomainError`], so the engine can classify
//! failures (retry, fail the turn, drop the job) without inspecting strings.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid ID format
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Business rule violation
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Entity is not in the lifecycle state the operation requires
    #[error("Conflicting state: {0}")]
    ConflictingState(String),

    /// Scanned data could not be parsed or does not match the declared shape
    #[error("Invalid scan data: {0}")]
    InvalidScanData(String),

    /// Scanned action references something the sheet never offered
    #[error("Invalid choice: {0}")]
    InvalidChoice(String),

    /// Unknown game type or sheet type
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A stored or scanned string does not name a known value
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    ///
    /// Use this when required fields are empty or values are out of range.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Create a constraint violation error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Create an invalid ID error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Create a conflicting state error
    pub fn conflicting_state(msg: impl Into<String>) -> Self {
        Self::ConflictingState(msg.into())
    }

    /// Create an invalid scan data error
    pub fn invalid_scan_data(msg: impl Into<String>) -> Self {
        Self::InvalidScanData(msg.into())
    }

    /// Create an invalid choice error
    pub fn invalid_choice(msg: impl Into<String>) -> Self {
        Self::InvalidChoice(msg.into())
    }

    /// Create an unsupported type error
    pub fn unsupported_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedType(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// True for errors caused by what the player wrote on the sheet.
    pub fn is_player_input_error(&self) -> bool {
        matches!(self, Self::InvalidScanData(_) | Self::InvalidChoice(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("game name is required");
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: game name is required");
    }

    #[test]
    fn test_not_found_error() {
        let err = DomainError::not_found("GameInstance", "123e4567-e89b-12d3-a456-426614174000");
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(err.to_string().contains("GameInstance"));
        assert!(err.to_string().contains("123e4567"));
    }

    #[test]
    fn test_conflicting_state_error() {
        let err = DomainError::conflicting_state("instance is processing");
        assert_eq!(err.to_string(), "Conflicting state: instance is processing");
    }

    #[test]
    fn test_player_input_errors() {
        assert!(DomainError::invalid_choice("D").is_player_input_error());
        assert!(DomainError::invalid_scan_data("bad json").is_player_input_error());
        assert!(!DomainError::conflicting_state("x").is_player_input_error());
    }
}
