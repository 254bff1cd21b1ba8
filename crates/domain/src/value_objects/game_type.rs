//! Game type routing key

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// The kind of game a [`crate::Game`] is. Immutable once the game is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Adventure,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Adventure => "adventure",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "adventure" => Ok(GameType::Adventure),
            other => Err(DomainError::unsupported_type(format!(
                "unknown game type: {}",
                other
            ))),
        }
    }
}
