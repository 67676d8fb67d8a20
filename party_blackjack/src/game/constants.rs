//! Table-wide constants and defaults.

use super::entities::Chips;

/// Chips every player receives when they sit down.
pub const DEFAULT_STARTING_CHIPS: Chips = 1000;

/// Largest configurable stack. Four doubled hands of it still fit a `Chips`.
pub const MAX_STARTING_CHIPS: Chips = 1_000_000_000;

/// Number of 52-card decks shuffled into a fresh shoe.
pub const DEFAULT_NUM_DECKS: usize = 6;

pub const DEFAULT_MAX_PLAYERS: usize = 7;

/// A player can split into at most this many hands.
pub const MAX_HANDS: usize = 4;

/// Delay between settlement and the table reopening for bets.
pub const DEFAULT_RESET_DELAY_MS: u64 = 6000;

pub const BLACKJACK: u32 = 21;

/// The dealer draws while below this value, soft or hard.
pub const DEALER_STAND_VALUE: u32 = 17;

pub const MAX_USERNAME_LENGTH: usize = 32;

pub const CARDS_PER_DECK: usize = 52;
