//! Backend E2E tests.
//!
//! These tests drive the whole pipeline through the real queue runners:
//! - File-backed SQLite via `tempfile` (no external services)
//! - The complete `App` with every use case and worker registered
//! - A frozen clock, so retried jobs never become due again within a test
//! - An `axum` stand-in for the OpenAI Responses API where scanning is involved
//!
//! # Running E2E Tests
//!
//! ```bash
//! cargo test -p playbymail-engine --lib e2e_tests
//! ```

mod e2e_helpers;
mod fake_openai;
mod scanning_retry_tests;

pub use e2e_helpers::*;
pub use fake_openai::*;
