//! The adventure game type.

mod game;
mod world;

pub use game::{AdventureGame, ResponseSummary};
pub use world::{initialize_world, join_character, JoinedCharacter, WorldSummary};
