//! Turn sheet kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// The kind of decision a turn sheet asks the player for.
///
/// `sheet_order` decides processing order within one character's turn:
/// inventory actions happen where the character stands, then the character moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetType {
    LocationChoice,
    InventoryManagement,
}

impl SheetType {
    /// Every adventure sheet type, in generation order.
    pub fn all() -> &'static [SheetType] {
        &[SheetType::InventoryManagement, SheetType::LocationChoice]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SheetType::LocationChoice => "location_choice",
            SheetType::InventoryManagement => "inventory_management",
        }
    }

    pub fn sheet_order(&self) -> i32 {
        match self {
            SheetType::InventoryManagement => 1,
            SheetType::LocationChoice => 2,
        }
    }
}

impl fmt::Display for SheetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SheetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "location_choice" => Ok(SheetType::LocationChoice),
            "inventory_management" => Ok(SheetType::InventoryManagement),
            other => Err(DomainError::unsupported_type(format!(
                "unknown sheet type: {}",
                other
            ))),
        }
    }
}
