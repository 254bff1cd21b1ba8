//! Domain entities - Core business objects with identity
//!
//! These are simple data structs: any combination of field values is storable,
//! so fields are public. Objects with lifecycle rules live in `aggregates`.

mod account;
mod adventure_turn_sheet;
mod character;
mod creature;
mod game;
mod item;
mod location;
mod subscription;

pub use account::{Account, AccountUser};
pub use adventure_turn_sheet::AdventureGameTurnSheet;
pub use character::{Character, CharacterInstance};
pub use creature::{Creature, CreatureInstance, CreaturePlacement};
pub use game::Game;
pub use item::{Item, ItemPlacementTemplate};
pub use location::{Location, LocationInstance, LocationLink};
pub use subscription::{GameSubscription, SubscriptionStatus, SubscriptionType};
