//! Aggregate roots - domain objects whose state changes must respect invariants
//!
//! Fields are private; storage rebuilds them with `new()` plus `with_*` builders,
//! and every mutation takes `now` and returns a `Result` when it can be refused.

pub mod game_instance;
pub mod item_instance;
pub mod turn_sheet;

pub use game_instance::{GameInstance, GameInstanceStatus};
pub use item_instance::{ItemInstance, ItemPlacement};
pub use turn_sheet::{GameTurnSheet, ProcessingStatus};
