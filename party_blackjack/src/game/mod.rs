//! Blackjack table engine - phase FSM and round logic.
//!
//! This module provides the synchronous room implementation:
//! - Cards, shoes, hands and players
//! - Hand valuation and settlement arithmetic
//! - Type-safe phase machine (betting, insurance, playing, dealer, payout)
//! - Redacted views and full snapshots

// Submodules
pub mod constants;
pub mod entities;
pub mod functional;
pub mod states;

// Declares the enum_dispatch traits, so it must precede `implementation`.
mod state_machine;

mod implementation;

pub use implementation::*;
pub use state_machine::{
    Game, GameData, GameEvent, GameSettings, GameStateManagement,
    PhaseIndependentUserManagement, TableError,
};
