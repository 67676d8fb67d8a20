//! WebSocket handler for player sessions.
//!
//! One connection is one seat. The connection joins its room on open and
//! leaves on close; in between the client sends commands and receives the
//! room's redacted view after every change.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{room}?name=<display>&shared=<bool>`
//! 2. Server assigns a player ID, joins (creating the room if needed) and
//!    sends `welcome`
//! 3. Server subscribes the session to the room and spawns a send task
//!    that forwards every broadcast view
//! 4. On disconnect the session unsubscribes and leaves the room
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/lobby?name=alice');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === "state") {
//!     render(msg.view);
//!   }
//! };
//!
//! ws.send(JSON.stringify({ type: "place_bet", amount: 100 }));
//! ```

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use party_blackjack::{
    entities::{Chips, PlayerId, RoomView, Username},
    table::{Command, ManagerError, StateChangeNotification, TableResponse},
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::AppState;
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Display name; blank names become "Guest"
    #[serde(default)]
    name: String,
    /// Start the room in shared-hand mode if this connection creates it
    #[serde(default)]
    shared: bool,
}

/// Client messages received via WebSocket
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    PlaceBet { amount: Chips },
    StartRound,
    Insurance { accept: bool },
    Hit,
    Stand,
    Double,
    Split,
    ToggleSharedMode,
    SetSharedMode { enabled: bool },
    /// Leave the room and close the session
    Leave,
}

impl ClientMessage {
    /// The table command this message maps to, `None` for `Leave`.
    fn into_command(self) -> Option<Command> {
        Some(match self {
            ClientMessage::PlaceBet { amount } => Command::PlaceBet(amount),
            ClientMessage::StartRound => Command::StartRound,
            ClientMessage::Insurance { accept } => Command::Insurance(accept),
            ClientMessage::Hit => Command::Hit,
            ClientMessage::Stand => Command::Stand,
            ClientMessage::Double => Command::Double,
            ClientMessage::Split => Command::Split,
            ClientMessage::ToggleSharedMode => Command::ToggleSharedMode,
            ClientMessage::SetSharedMode { enabled } => Command::SetSharedMode(enabled),
            ClientMessage::Leave => return None,
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            ClientMessage::PlaceBet { .. } => "place_bet",
            ClientMessage::StartRound => "start_round",
            ClientMessage::Insurance { .. } => "insurance",
            ClientMessage::Hit => "hit",
            ClientMessage::Stand => "stand",
            ClientMessage::Double => "double",
            ClientMessage::Split => "split",
            ClientMessage::ToggleSharedMode => "toggle_shared_mode",
            ClientMessage::SetSharedMode { .. } => "set_shared_mode",
            ClientMessage::Leave => "leave",
        }
    }
}

/// Messages sent to the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage<'a> {
    /// Sent once after the join succeeds
    Welcome { player_id: &'a PlayerId, room: &'a str },
    /// Room view after every change
    State { view: &'a RoomView },
    /// The last command changed nothing
    Rejected { reason: String },
}

impl ServerMessage<'_> {
    fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                error!("Failed to serialize server message: {}", e);
                None
            }
        }
    }

    fn rejected(reason: impl ToString) -> Option<String> {
        ServerMessage::Rejected {
            reason: reason.to_string(),
        }
        .to_json()
    }
}

/// Upgrade HTTP connection to a player session in `room`.
///
/// # Path Parameters
///
/// - `room`: Room name; the room is created on first join
///
/// # Query Parameters
///
/// - `name`: Display name
/// - `shared`: Request shared-hand mode (only applies when creating the room)
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, room, query, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, room: String, query: WsQuery, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let player_id = PlayerId::from(uuid::Uuid::new_v4().to_string());
    let username = Username::new(&query.name);
    metrics::websocket_connections_total();

    let joined = state
        .table_manager
        .join_table(&room, player_id.clone(), username.clone(), query.shared)
        .await;

    match joined {
        Ok(TableResponse::Success) => {}
        Ok(response) => {
            let reason = response
                .error_message()
                .unwrap_or_else(|| "Join refused".to_string());
            if let Some(json) = ServerMessage::rejected(reason) {
                let _ = sender.send(Message::Text(json.into())).await;
            }
            let _ = sender.close().await;
            return;
        }
        Err(e) => {
            error!("Failed to join room '{}': {}", room, e);
            if let Some(json) = ServerMessage::rejected(e) {
                let _ = sender.send(Message::Text(json.into())).await;
            }
            let _ = sender.close().await;
            return;
        }
    }

    info!("WebSocket connected: room={}, player={} ({})", room, player_id, username);
    metrics::player_joined();
    metrics::rooms_active(state.table_manager.active_table_count().await);

    let welcome = ServerMessage::Welcome {
        player_id: &player_id,
        room: &room,
    };
    if let Some(json) = welcome.to_json()
        && sender.send(Message::Text(json.into())).await.is_err()
    {
        leave(&state, &room, &player_id).await;
        return;
    }

    // Channel for responses from the message handler
    let (response_tx, mut response_rx) = mpsc::channel::<String>(32);

    // Subscribe to room state change notifications
    let (notification_tx, mut notification_rx) = mpsc::channel::<StateChangeNotification>(32);
    if let Err(e) = state
        .table_manager
        .subscribe(&room, player_id.clone(), notification_tx)
        .await
    {
        error!("Failed to subscribe to room '{}': {}", room, e);
        leave(&state, &room, &player_id).await;
        return;
    }

    let send_task = tokio::spawn(async move {
        loop {
            let json = tokio::select! {
                Some(notification) = notification_rx.recv() => match notification {
                    StateChangeNotification::StateChanged(view) => {
                        ServerMessage::State { view: &view }.to_json()
                    }
                    StateChangeNotification::Closed => break,
                },
                Some(response_json) = response_rx.recv() => Some(response_json),
                else => break,
            };

            if let Some(json) = json
                && sender.send(Message::Text(json.into())).await.is_err()
            {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut received: u64 = 0;
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                received += 1;
                let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => client_msg,
                    Err(e) => {
                        warn!("Failed to parse client message: {}", e);
                        if let Some(json) = ServerMessage::rejected("Invalid message format")
                            && response_tx.send(json).await.is_err()
                        {
                            break;
                        }
                        continue;
                    }
                };
                metrics::websocket_messages_received(client_msg.kind());

                let Some(command) = client_msg.into_command() else {
                    break;
                };

                let reply = match state
                    .table_manager
                    .send_command(&room, player_id.clone(), command)
                    .await
                {
                    Ok(TableResponse::Rejected(e)) => ServerMessage::rejected(e),
                    Ok(_) => {
                        if command == Command::StartRound {
                            metrics::rounds_played_total();
                        }
                        None
                    }
                    Err(e @ ManagerError::RoomNotFound(_)) | Err(e @ ManagerError::TableClosed(_)) => {
                        warn!("Room '{}' went away under player {}: {}", room, player_id, e);
                        break;
                    }
                    Err(e) => ServerMessage::rejected(e),
                };

                if let Some(json) = reply
                    && response_tx.send(json).await.is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket closed: room={}, player={}", room, player_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    leave(&state, &room, &player_id).await;
    logging::log_session_closed(&room, player_id.as_str(), received);
}

/// Unsubscribe and give up the seat; the last player out closes the room.
/// Gives up the session's seat. Returns whether the room released it.
async fn leave(state: &AppState, room: &str, player_id: &PlayerId) -> bool {
    let _ = state
        .table_manager
        .unsubscribe(room, player_id.clone())
        .await;

    let released = match state.table_manager.leave_table(room, player_id.clone()).await {
        Ok(TableResponse::Left { remaining_players }) => {
            info!(
                "Player {} left room '{}', {} remaining",
                player_id, room, remaining_players
            );
            metrics::player_left();
            true
        }
        Ok(response) => {
            warn!(
                "Leave for player {} in room '{}' refused: {:?}",
                player_id,
                room,
                response.error_message()
            );
            false
        }
        Err(e) => {
            warn!("Failed to leave room '{}' for player {}: {}", room, player_id, e);
            false
        }
    };
    metrics::rooms_active(state.table_manager.active_table_count().await);
    released
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_messages() {
        let parse = |s: &str| serde_json::from_str::<ClientMessage>(s).unwrap();

        assert_eq!(
            parse(r#"{"type":"place_bet","amount":100}"#),
            ClientMessage::PlaceBet { amount: 100 }
        );
        assert_eq!(
            parse(r#"{"type":"insurance","accept":true}"#),
            ClientMessage::Insurance { accept: true }
        );
        assert_eq!(
            parse(r#"{"type":"set_shared_mode","enabled":false}"#),
            ClientMessage::SetSharedMode { enabled: false }
        );
        assert_eq!(parse(r#"{"type":"split"}"#), ClientMessage::Split);
    }

    #[test]
    fn test_unknown_or_malformed_messages_fail() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"surrender"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"place_bet"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>("hit").is_err());
    }

    #[tokio::test]
    async fn test_leave_releases_seat_once() {
        let state = AppState {
            table_manager: std::sync::Arc::new(
                party_blackjack::table::TableManager::new(Default::default()).unwrap(),
            ),
        };
        let id = PlayerId::from("p-1");
        state
            .table_manager
            .join_table("lobby", id.clone(), Username::new("alice"), false)
            .await
            .unwrap();

        assert!(leave(&state, "lobby", &id).await);
        assert!(!leave(&state, "lobby", &id).await);
        assert_eq!(state.table_manager.active_table_count().await, 0);
    }

    #[test]
    fn test_leave_has_no_command() {
        assert_eq!(ClientMessage::Leave.into_command(), None);
        assert_eq!(
            ClientMessage::ToggleSharedMode.into_command(),
            Some(Command::ToggleSharedMode)
        );
    }

    #[test]
    fn test_server_message_shape() {
        let json = ServerMessage::rejected("not your turn").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "rejected");
        assert_eq!(value["reason"], "not your turn");

        let id = PlayerId::from("p-1");
        let json = ServerMessage::Welcome {
            player_id: &id,
            room: "lobby",
        }
        .to_json()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "welcome");
        assert_eq!(value["player_id"], "p-1");
    }
}
