use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|e| crate::DomainError::invalid_id(format!("{}: {}", s, e)))
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// Game content
define_id!(GameId);
define_id!(GameInstanceId);

// Accounts
define_id!(AccountId);
define_id!(AccountUserId);
define_id!(GameSubscriptionId);

// Adventure content (authored templates)
define_id!(LocationId);
define_id!(LocationLinkId);
define_id!(ItemId);
define_id!(ItemPlacementId);
define_id!(CreatureId);
define_id!(CreaturePlacementId);
define_id!(CharacterId);

// Adventure live world
define_id!(LocationInstanceId);
define_id!(ItemInstanceId);
define_id!(CreatureInstanceId);
define_id!(CharacterInstanceId);

// Turn sheets
define_id!(GameTurnSheetId);
define_id!(AdventureGameTurnSheetId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_uuid_strings() {
        let uuid = Uuid::new_v4();
        let id = LocationInstanceId::from_uuid(uuid);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));

        let back: LocationInstanceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn from_str_trims_and_rejects_garbage() {
        let uuid = Uuid::new_v4();
        let parsed: ItemInstanceId = format!("  {}\n", uuid).parse().unwrap();
        assert_eq!(parsed.to_uuid(), uuid);

        let err = "not-a-uuid".parse::<ItemInstanceId>().unwrap_err();
        assert!(matches!(err, crate::DomainError::InvalidId(_)));
    }
}
