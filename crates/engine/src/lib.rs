//! Play-by-mail engine library.
//!
//! Processes the turns of play-by-mail games: a scheduler finds due game
//! instances, queue workers apply the players' scanned turn sheets and print the
//! next ones, and an AI vision client reads the returned paper.
//!
//! ## Structure
//!
//! - `use_cases/` - turn processing, scheduling, sheet processors, scanning,
//!   subscriptions and notifications
//! - `infrastructure/` - ports and adapters, SQLite persistence, the job queue
//! - `queue_types` - job payloads
//! - `app` - Application composition
//! - `config` - environment configuration

pub mod app;
pub mod config;
pub mod infrastructure;
pub mod queue_types;
pub mod use_cases;

/// Test fixtures module for integration testing.
#[cfg(test)]
pub mod test_fixtures;

/// End-to-end scenarios driven through the queue runners.
#[cfg(test)]
mod e2e_tests;

pub use app::App;
