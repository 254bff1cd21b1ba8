//! Play-by-mail domain: games, instances, characters, the live adventure world,
//! and the turn sheets that carry player decisions on paper.
//!
//! Pure types and rules only. Persistence, queues and external services live in
//! `playbymail-engine`.

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use aggregates::{
    GameInstance, GameInstanceStatus, GameTurnSheet, ItemInstance, ItemPlacement,
    ProcessingStatus,
};

pub use entities::{
    Account, AccountUser, AdventureGameTurnSheet, Character, CharacterInstance, Creature,
    CreatureInstance, CreaturePlacement, Game, GameSubscription, Item, ItemPlacementTemplate,
    Location, LocationInstance, LocationLink, SubscriptionStatus, SubscriptionType,
};

pub use error::DomainError;

pub use ids::{
    AccountId, AccountUserId, AdventureGameTurnSheetId, CharacterId, CharacterInstanceId,
    CreatureId, CreatureInstanceId, CreaturePlacementId, GameId, GameInstanceId,
    GameSubscriptionId, GameTurnSheetId, ItemId, ItemInstanceId, ItemPlacementId, LocationId,
    LocationInstanceId, LocationLinkId,
};

pub use value_objects::{
    EquipAction, EquipmentSlot, EquipmentSlots, EquippedItem, GameConfig, GameType,
    InventoryItem, InventoryManagementScanData, InventoryManagementSheetData, InventoryPlan,
    LocationChoiceScanData, LocationChoiceSheetData, LocationItem, LocationOption, SheetType,
    TurnSheetHeader,
};
