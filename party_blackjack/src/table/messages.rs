//! Table actor message types.

use crate::game::{
    TableError,
    entities::{Chips, Phase, PlayerId, RoomSnapshot, RoomView, Username},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// In-round commands a seated player can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    PlaceBet(Chips),
    StartRound,
    Insurance(bool),
    Hit,
    Stand,
    Double,
    Split,
    ToggleSharedMode,
    SetSharedMode(bool),
}

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Join table request
    JoinTable {
        player_id: PlayerId,
        username: Username,
        response: oneshot::Sender<TableResponse>,
    },

    /// Leave table request
    LeaveTable {
        player_id: PlayerId,
        response: oneshot::Sender<TableResponse>,
    },

    /// Player command (bet, hit, stand, ...)
    Command {
        player_id: PlayerId,
        command: Command,
        response: oneshot::Sender<TableResponse>,
    },

    /// Get the redacted room view
    GetView {
        response: oneshot::Sender<RoomView>,
    },

    /// Get the full room snapshot, hole card included
    GetSnapshot {
        response: oneshot::Sender<RoomSnapshot>,
    },

    /// Get a lightweight summary for room listings
    GetSummary {
        response: oneshot::Sender<TableSummary>,
    },

    /// Internal: return to betting after the payout of `round` (sent by
    /// the reset timer)
    ResetRound { round: u64 },

    /// Subscribe to state change notifications
    Subscribe {
        player_id: PlayerId,
        sender: mpsc::Sender<StateChangeNotification>,
    },

    /// Unsubscribe from state change notifications
    Unsubscribe { player_id: PlayerId },

    /// Close table
    Close {
        response: oneshot::Sender<TableResponse>,
    },
}

/// Notification sent when table state changes
#[derive(Debug, Clone)]
pub enum StateChangeNotification {
    /// Room state changed; carries the redacted view every seat sees
    StateChanged(Arc<RoomView>),
    /// The room was closed
    Closed,
}

/// Response from table operations
#[derive(Debug, Clone, PartialEq)]
pub enum TableResponse {
    /// Operation succeeded
    Success,

    /// Player left; carries the number of players still seated
    Left { remaining_players: usize },

    /// Operation was refused and the room is unchanged
    Rejected(TableError),
}

/// Room listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    /// Room name
    pub name: String,

    /// Current player count
    pub player_count: usize,

    /// Maximum players
    pub max_players: usize,

    /// Current game phase
    pub phase: Phase,

    /// Shared-hand mode
    pub shared_mode: bool,

    /// Rounds dealt so far
    pub round: u64,
}

impl TableResponse {
    /// Check if response is success
    pub fn is_success(&self) -> bool {
        matches!(self, TableResponse::Success | TableResponse::Left { .. })
    }

    /// Get error message if response is error
    pub fn error_message(&self) -> Option<String> {
        match self {
            TableResponse::Rejected(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

impl From<Result<(), TableError>> for TableResponse {
    fn from(value: Result<(), TableError>) -> Self {
        match value {
            Ok(()) => TableResponse::Success,
            Err(err) => TableResponse::Rejected(err),
        }
    }
}
