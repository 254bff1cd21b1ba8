//! Use cases: the jobs the engine runs and the scan upload path.

pub mod adventure;
pub mod notifications;
pub mod subscriptions;
pub mod turn_sheets;
pub mod turns;
