//! Table module providing multi-room support with an async actor model.
//!
//! This module implements:
//! - TableActor: Async actor owning a single blackjack room
//! - TableManager: Registry creating and closing rooms by name
//! - Message-based communication with tokio channels
//! - Room configuration and the payout reset timer
//!
//! ## Architecture
//!
//! Each room runs in a separate Tokio task with an mpsc message inbox, so
//! every command against a room runs to completion before the next one.
//! The TableManager creates rooms on first join and closes them when the
//! last player leaves. The payout reset timer looks its room up by name
//! when it fires and does nothing if the room has gone.
//!
//! ## Example
//!
//! ```no_run
//! use party_blackjack::table::{TableConfig, TableManager, messages::Command};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = TableManager::new(TableConfig::default()).unwrap();
//!
//!     manager
//!         .join_table("lobby", "p1".into(), "alice".into(), false)
//!         .await
//!         .unwrap();
//!     manager
//!         .send_command("lobby", "p1".into(), Command::PlaceBet(100))
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;

pub use actor::{TableActor, TableHandle, TableId};
pub use config::TableConfig;
pub use manager::{ManagerError, TableManager, TableRegistry};
pub use messages::{Command, StateChangeNotification, TableMessage, TableResponse, TableSummary};
