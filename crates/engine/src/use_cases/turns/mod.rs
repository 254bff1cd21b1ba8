//! Turn scheduling and processing.

mod error;
mod process;
mod schedule;

pub use error::{CharacterFailure, TurnProcessingError};
pub use process::{ProcessGameTurn, TurnOutcome};
pub use schedule::{ScheduleDueTurns, ScheduleSummary};
