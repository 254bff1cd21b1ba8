use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Display-level equipment slots. A character holds at most one item per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    Armor,
    Clothing,
    Jewelry,
}

impl EquipmentSlot {
    pub fn all() -> &'static [EquipmentSlot] {
        &[
            EquipmentSlot::Weapon,
            EquipmentSlot::Armor,
            EquipmentSlot::Clothing,
            EquipmentSlot::Jewelry,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentSlot::Weapon => "weapon",
            EquipmentSlot::Armor => "armor",
            EquipmentSlot::Clothing => "clothing",
            EquipmentSlot::Jewelry => "jewelry",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EquipmentSlot::Weapon => "Weapon",
            EquipmentSlot::Armor => "Armor",
            EquipmentSlot::Clothing => "Clothing",
            EquipmentSlot::Jewelry => "Jewelry",
        }
    }
}

impl fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentSlot {
    type Err = DomainError;

    /// Case-insensitive; scanned sheets come back as "Weapon", "weapon " and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weapon" => Ok(EquipmentSlot::Weapon),
            "armor" | "armour" => Ok(EquipmentSlot::Armor),
            "clothing" => Ok(EquipmentSlot::Clothing),
            "jewelry" | "jewellery" => Ok(EquipmentSlot::Jewelry),
            other => Err(DomainError::parse(format!("unknown equipment slot: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loosely_written_slots() {
        assert_eq!(" Weapon ".parse::<EquipmentSlot>().unwrap(), EquipmentSlot::Weapon);
        assert_eq!("ARMOUR".parse::<EquipmentSlot>().unwrap(), EquipmentSlot::Armor);
        assert!("hat".parse::<EquipmentSlot>().is_err());
    }
}
