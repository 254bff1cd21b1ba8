//! Infrastructure implementations.
//!
//! Port adapters for external services, SQLite persistence, and the job queue
//! with its workers.

pub mod clock;
pub mod email;
pub mod image_prep;
pub mod openai;
pub mod persistence;
pub mod ports;
pub mod queue;
pub mod queue_workers;
pub mod renderer;
pub mod resilient_extraction;
pub mod turn_sheet_code;
