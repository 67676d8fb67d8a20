//! Shared-table blackjack server.
//!
//! Serves the rooms of a [`party_blackjack::table::TableManager`] over
//! WebSocket sessions, with a small read-only REST surface.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
