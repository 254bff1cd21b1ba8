//! SQLite persistence
//!
//! One database holds the authored content, the live game state and the job
//! queue. Work happens through a [`Model`], which owns a transaction; the
//! repository methods are spread over the `*_repository.rs` files by entity.

mod account_repository;
mod character_repository;
mod connection;
mod creature_repository;
mod game_repository;
mod item_repository;
mod location_repository;
mod model;
pub(crate) mod rows;
mod schema;
mod subscription_repository;
mod turn_sheet_repository;

pub use connection::{connect, ConnectionSettings, DEFAULT_BUSY_TIMEOUT};
pub use item_repository::PlacedItem;
pub use location_repository::LocationExit;
pub use model::Model;
pub use schema::ensure_schema;
