//! Port traits for infrastructure boundaries.
//!
//! These are the only abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - AI extraction (OpenAI today, any vision model tomorrow)
//! - Document rendering (HTML to PDF/PNG service)
//! - Email delivery
//! - Clock (for testing)
//!
//! Persistence is not behind a port: every job owns one SQLite transaction through
//! the concrete [`crate::infrastructure::persistence::Model`].

mod error;
mod external;
mod testing;

pub use error::{EmailError, ExtractionError, QueueError, RenderError, RepoError};

pub use external::{
    DocumentRendererPort, EmailMessage, EmailPort, ImageExtractionPort,
    StructuredExtractionRequest,
};

pub use testing::ClockPort;

#[cfg(test)]
pub use external::{MockDocumentRendererPort, MockEmailPort, MockImageExtractionPort};

#[cfg(test)]
pub use testing::MockClockPort;
