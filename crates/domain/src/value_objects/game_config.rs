use chrono::Duration;
use serde::{Deserialize, Serialize};

const DEFAULT_TURN_DURATION_HOURS: u32 = 168;
/// Longest turn a game may configure: one year.
pub const MAX_TURN_DURATION_HOURS: u32 = 24 * 365;
const DEFAULT_STARTING_HEALTH: i32 = 100;
const DEFAULT_INVENTORY_CAPACITY: i32 = 10;

/// Per-instance settings stored as JSON on `game_instance.game_config`.
///
/// Every field is optional in storage; accessors supply defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_duration_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_health: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_capacity: Option<i32>,
}

impl GameConfig {
    pub fn with_turn_duration_hours(mut self, hours: u32) -> Self {
        self.turn_duration_hours = Some(hours);
        self
    }

    /// Time between turns. Zero or missing falls back to one week; longer
    /// than a year is capped at a year.
    pub fn turn_period(&self) -> Duration {
        let hours = self
            .turn_duration_hours
            .filter(|h| *h > 0)
            .unwrap_or(DEFAULT_TURN_DURATION_HOURS)
            .min(MAX_TURN_DURATION_HOURS);
        Duration::hours(i64::from(hours))
    }

    pub fn starting_health(&self) -> i32 {
        self.starting_health.unwrap_or(DEFAULT_STARTING_HEALTH)
    }

    pub fn inventory_capacity(&self) -> i32 {
        self.inventory_capacity
            .filter(|c| *c >= 0)
            .unwrap_or(DEFAULT_INVENTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_a_week() {
        assert_eq!(GameConfig::default().turn_period(), Duration::days(7));
        let zero = GameConfig::default().with_turn_duration_hours(0);
        assert_eq!(zero.turn_period(), Duration::days(7));
    }

    #[test]
    fn huge_durations_are_capped_at_a_year() {
        let config: GameConfig =
            serde_json::from_str(r#"{"turn_duration_hours": 4294967295}"#).unwrap();
        assert_eq!(config.turn_period(), Duration::days(365));
    }

    #[test]
    fn reads_sparse_json() {
        let config: GameConfig = serde_json::from_str(r#"{"turn_duration_hours": 24}"#).unwrap();
        assert_eq!(config.turn_period(), Duration::hours(24));
        assert_eq!(config.inventory_capacity(), 10);
        assert_eq!(config.starting_health(), 100);
    }
}
