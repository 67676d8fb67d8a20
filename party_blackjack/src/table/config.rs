//! Table configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{
    GameSettings,
    constants::{
        DEFAULT_MAX_PLAYERS, DEFAULT_NUM_DECKS, DEFAULT_RESET_DELAY_MS, DEFAULT_STARTING_CHIPS,
        MAX_HANDS, MAX_STARTING_CHIPS,
    },
    entities::Chips,
};

/// Room configuration, shared by every room a manager creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Chips each player sits down with (default: 1000)
    pub starting_chips: Chips,

    /// Decks per shoe (default: 6)
    pub num_decks: usize,

    /// Maximum number of players per room (default: 7)
    pub max_players: usize,

    /// Delay between settlement and the next betting phase
    pub reset_delay_ms: u64,

    /// Maximum hands a player can hold after splitting (default: 4)
    pub max_hands: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            starting_chips: DEFAULT_STARTING_CHIPS,
            num_decks: DEFAULT_NUM_DECKS,
            max_players: DEFAULT_MAX_PLAYERS,
            reset_delay_ms: DEFAULT_RESET_DELAY_MS,
            max_hands: MAX_HANDS,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.starting_chips == 0 || self.starting_chips > MAX_STARTING_CHIPS {
            return Err(format!(
                "Starting chips must be between 1 and {MAX_STARTING_CHIPS}"
            ));
        }

        if self.num_decks == 0 || self.num_decks > 8 {
            return Err("Number of decks must be between 1 and 8".to_string());
        }

        if self.max_players == 0 || self.max_players > 7 {
            return Err("Max players must be between 1 and 7".to_string());
        }

        if self.max_hands == 0 || self.max_hands > MAX_HANDS {
            return Err(format!("Max hands must be between 1 and {MAX_HANDS}"));
        }

        Ok(())
    }

    /// Get the payout display time before a room resets
    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    /// Engine settings for a new room
    pub fn game_settings(&self) -> GameSettings {
        GameSettings::new(
            self.starting_chips,
            self.num_decks,
            self.max_players,
            self.max_hands,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TableConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reset_delay(), Duration::from_secs(6));
    }

    #[test]
    fn test_zero_decks_rejected() {
        let config = TableConfig {
            num_decks: 0,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_stack_rejected() {
        let config = TableConfig {
            starting_chips: u32::MAX,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TableConfig {
            starting_chips: MAX_STARTING_CHIPS,
            ..TableConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_too_many_players_rejected() {
        let config = TableConfig {
            max_players: 8,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_game_settings_carry_config() {
        let config = TableConfig {
            starting_chips: 500,
            ..TableConfig::default()
        };
        let settings = config.game_settings();
        assert_eq!(settings.starting_chips, 500);
        assert_eq!(settings.max_hands, MAX_HANDS);
    }
}
