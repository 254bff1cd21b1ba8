//! Error types for port operations.

use std::time::Duration;

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Entity not found - includes entity type and ID for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Another transaction holds the write lock.
    #[error("Database busy in {operation}: {message}")]
    Busy {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Business constraint violated.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl RepoError {
    /// Create a NotFound error with entity type and ID context.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create a Database error with operation context.
    ///
    /// SQLite lock contention and constraint failures get their own variants so
    /// callers can decide whether to retry.
    pub fn database(operation: &'static str, error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &error {
            let message = db.message().to_string();
            let lowered = message.to_ascii_lowercase();
            if lowered.contains("database is locked") || lowered.contains("database is busy") {
                return Self::Busy { operation, message };
            }
            if lowered.contains("constraint failed") {
                return Self::ConstraintViolation(format!("{}: {}", operation, message));
            }
        }
        if matches!(error, sqlx::Error::PoolTimedOut) {
            return Self::Busy {
                operation,
                message: error.to_string(),
            };
        }
        Self::Database {
            operation,
            message: error.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    /// Create a ConstraintViolation error.
    pub fn constraint(message: impl ToString) -> Self {
        Self::ConstraintViolation(message.to_string())
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Lock contention and lost connections are worth another attempt later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy { .. } | Self::Database { .. })
    }
}

/// Errors from the AI vision/extraction endpoint.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction request failed: {0}")]
    Network(String),
    #[error("Extraction request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Extraction endpoint returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Extraction API error ({error_type}): {message}")]
    Api { error_type: String, message: String },
    #[error("Model refused the request: {0}")]
    Refusal(String),
    #[error("no text returned")]
    EmptyOutput,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Image preparation failed: {0}")]
    Image(String),
    #[error("Extraction failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<ExtractionError>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(String),
    #[error("Renderer request failed: {0}")]
    RequestFailed(String),
    #[error("Renderer returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email delivery failed: {0}")]
    SendFailed(String),
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue database error: {0}")]
    Database(#[from] RepoError),
    #[error("Job args could not be encoded or decoded: {0}")]
    Serialization(String),
    #[error("Job not found: {0}")]
    NotFound(String),
}
