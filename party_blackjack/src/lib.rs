//! # Party Blackjack
//!
//! A shared-table, multiplayer blackjack engine built on a type-safe finite
//! state machine.
//!
//! Several players sit at one room, bet, act in turn and settle against a
//! single dealer hand. A room can also run in shared mode, where every
//! player acts on one communal hand. The room is implemented as an FSM using
//! `enum_dispatch` for zero-cost trait dispatch over its phases:
//!
//! - **Betting**: players place (or replace) their opening bet
//! - **Insurance**: the dealer shows an ace and every dealt-in player
//!   answers the insurance offer
//! - **Playing**: players hit, stand, double or split in seat order
//! - **Dealer**: the dealer draws to 17 and bets are settled
//! - **Payout**: results are shown until the room is reset
//!
//! ## Core Modules
//!
//! - [`game`]: Synchronous room state machine, entities and payout logic
//! - [`table`]: Async per-room actors and the room registry
//!
//! ## Example
//!
//! ```
//! use party_blackjack::{GameStateManagement, TableState, entities::Phase};
//!
//! let mut room = TableState::new();
//! room.join(&"p1".into(), &"alice".into()).unwrap();
//! room.place_bet(&"p1".into(), 100).unwrap();
//! room.start_round().unwrap();
//! assert_ne!(room.phase(), Phase::Betting);
//! ```

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    GameEvent, GameSettings, GameStateManagement, PhaseIndependentUserManagement, TableError,
    TableState,
    constants::{self, DEFAULT_MAX_PLAYERS, DEFAULT_STARTING_CHIPS},
    entities, functional,
};

/// Async table actors and the room registry.
pub mod table;
pub use table::{TableActor, TableConfig, TableHandle, TableManager};
