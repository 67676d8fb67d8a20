//! Table actor implementation with async message handling.

use super::{
    config::TableConfig,
    manager::{ManagerError, TableRegistry},
    messages::{Command, StateChangeNotification, TableMessage, TableResponse, TableSummary},
};
use crate::game::{
    GameStateManagement, TableError, TableState,
    entities::{Phase, PlayerId},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifies one incarnation of a room. A room that is closed and later
/// recreated under the same name gets a new id.
pub type TableId = u64;

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
    name: Arc<str>,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>, table_id: TableId, name: &str) -> Self {
        Self {
            sender,
            table_id,
            name: Arc::from(name),
        }
    }

    /// Get table ID
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Get room name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> Result<(), ManagerError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| ManagerError::TableClosed(self.name.to_string()))
    }
}

/// Table actor owning a single blackjack room
pub struct TableActor {
    /// Table ID
    id: TableId,

    /// Room name (registry key)
    name: String,

    /// Table configuration
    config: TableConfig,

    /// Blackjack room state (FSM)
    state: TableState,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Registry the reset timer resolves this room through
    registry: TableRegistry,

    /// Is table closed
    is_closed: bool,

    /// Subscribers for state change notifications
    subscribers: HashMap<PlayerId, mpsc::Sender<StateChangeNotification>>,
}

impl TableActor {
    /// Create a new table actor
    ///
    /// # Arguments
    ///
    /// * `id` - Table ID
    /// * `name` - Room name, used as the registry key
    /// * `config` - Table configuration
    /// * `registry` - Registry the room will be stored in
    /// * `shared_mode` - Whether the room starts in shared-hand mode
    ///
    /// # Returns
    ///
    /// * `(TableActor, TableHandle)` - Actor and handle for sending messages
    pub fn new(
        id: TableId,
        name: &str,
        config: TableConfig,
        registry: TableRegistry,
        shared_mode: bool,
    ) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(100);

        let mut state = TableState::from(config.game_settings());
        if shared_mode && let Err(e) = state.set_shared_mode(true) {
            log::error!("Room '{name}': failed to enable shared mode: {e}");
        }
        // Setup events aren't interesting to anyone.
        state.drain_events();

        let actor = Self {
            id,
            name: name.to_string(),
            config,
            state,
            inbox,
            registry,
            is_closed: false,
            subscribers: HashMap::new(),
        };

        let handle = TableHandle::new(sender, id, name);

        (actor, handle)
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!("Room {} '{}' open", self.id, self.name);

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message);

            if self.is_closed {
                break;
            }
        }

        self.notify(StateChangeNotification::Closed);
        log::info!("Room {} '{}' closed", self.id, self.name);
    }

    /// Handle a table message
    fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::JoinTable {
                player_id,
                username,
                response,
            } => {
                let result = self.apply(|state| state.join(&player_id, &username));
                if result.is_ok() {
                    log::info!("Room '{}': {username} ({player_id}) sat down", self.name);
                }
                let _ = response.send(result.into());
            }

            TableMessage::LeaveTable {
                player_id,
                response,
            } => {
                let _ = response.send(self.handle_leave(&player_id));
            }

            TableMessage::Command {
                player_id,
                command,
                response,
            } => {
                let result = self.apply(|state| Self::dispatch(state, &player_id, command));
                if let Err(e) = &result {
                    log::debug!(
                        "Room '{}': {command:?} from {player_id} rejected: {e}",
                        self.name
                    );
                }
                let _ = response.send(result.into());
            }

            TableMessage::GetView { response } => {
                let _ = response.send(self.state.view());
            }

            TableMessage::GetSnapshot { response } => {
                let _ = response.send(self.state.snapshot());
            }

            TableMessage::GetSummary { response } => {
                let _ = response.send(self.summary());
            }

            TableMessage::ResetRound { round } => {
                if let Err(e) = self.apply(|state| state.reset_round(round)) {
                    log::debug!("Room '{}': reset timer ignored: {e}", self.name);
                }
            }

            TableMessage::Subscribe { player_id, sender } => {
                log::debug!(
                    "{} subscribed to room '{}' state changes",
                    player_id,
                    self.name
                );
                // New subscribers get the current view straight away.
                let view = Arc::new(self.state.view());
                if sender
                    .try_send(StateChangeNotification::StateChanged(view))
                    .is_ok()
                {
                    self.subscribers.insert(player_id, sender);
                }
            }

            TableMessage::Unsubscribe { player_id } => {
                self.subscribers.remove(&player_id);
                log::debug!(
                    "{} unsubscribed from room '{}' state changes",
                    player_id,
                    self.name
                );
            }

            TableMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(TableResponse::Success);
            }
        }
    }

    fn dispatch(state: &mut TableState, id: &PlayerId, command: Command) -> Result<(), TableError> {
        match command {
            Command::PlaceBet(amount) => state.place_bet(id, amount),
            Command::StartRound => state.start_round(),
            Command::Insurance(accept) => state.insurance(id, accept),
            Command::Hit => state.hit(id),
            Command::Stand => state.stand(id),
            Command::Double => state.double(id),
            Command::Split => state.split(id),
            Command::ToggleSharedMode => state.toggle_shared_mode(),
            Command::SetSharedMode(enabled) => state.set_shared_mode(enabled),
        }
    }

    /// Runs one engine operation and, when it applied, publishes the change
    /// and arms the reset timer if the room just reached payout.
    fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut TableState) -> Result<T, TableError>,
    ) -> Result<T, TableError> {
        let before = (self.state.phase(), self.state.round());
        let result = op(&mut self.state)?;

        for event in self.state.drain_events() {
            log::debug!("Room '{}': {event}", self.name);
        }

        let after = (self.state.phase(), self.state.round());
        if after.0 == Phase::Payout && before != after {
            self.schedule_reset(after.1);
        }

        let view = Arc::new(self.state.view());
        self.notify(StateChangeNotification::StateChanged(view));
        Ok(result)
    }

    fn handle_leave(&mut self, player_id: &PlayerId) -> TableResponse {
        self.subscribers.remove(player_id);
        match self.apply(|state| state.leave(player_id)) {
            Ok(remaining_players) => {
                log::info!(
                    "Room '{}': {player_id} left, {remaining_players} remaining",
                    self.name
                );
                TableResponse::Left { remaining_players }
            }
            Err(e) => TableResponse::Rejected(e),
        }
    }

    /// Arms the payout timer for `round`. The timer resolves the room by name
    /// when it fires, so a room that was closed in the meantime is skipped.
    fn schedule_reset(&self, round: u64) {
        let registry = self.registry.clone();
        let name = self.name.clone();
        let table_id = self.id;
        let delay = self.config.reset_delay();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let handle = registry.read().await.get(&name).cloned();
            match handle {
                Some(handle) if handle.table_id() == table_id => {
                    if let Err(e) = handle.send(TableMessage::ResetRound { round }).await {
                        log::debug!("Reset for room '{name}' round {round} not delivered: {e}");
                    }
                }
                _ => {
                    log::debug!("Reset for room '{name}' round {round} dropped, room is gone");
                }
            }
        });
    }

    fn summary(&self) -> TableSummary {
        TableSummary {
            name: self.name.clone(),
            player_count: self.state.player_count(),
            max_players: self.config.max_players,
            phase: self.state.phase(),
            shared_mode: self.state.shared_mode(),
            round: self.state.round(),
        }
    }

    /// Broadcast state change notification to all subscribers
    fn notify(&mut self, notification: StateChangeNotification) {
        self.subscribers.retain(|player_id, sender| {
            match sender.try_send(notification.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("Subscriber {player_id} channel full, dropping notification");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Subscriber {player_id} disconnected, removing");
                    false
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Username;
    use std::time::Duration;
    use tokio::sync::{RwLock, oneshot};

    fn spawn_room(config: TableConfig) -> (TableHandle, TableRegistry) {
        let registry: TableRegistry = Arc::new(RwLock::new(HashMap::new()));
        let (actor, handle) = TableActor::new(1, "test", config, registry.clone(), false);
        tokio::spawn(actor.run());
        (handle, registry)
    }

    async fn command(handle: &TableHandle, id: &str, command: Command) -> TableResponse {
        let (tx, rx) = oneshot::channel();
        handle
            .send(TableMessage::Command {
                player_id: id.into(),
                command,
                response: tx,
            })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn join(handle: &TableHandle, id: &str) -> TableResponse {
        let (tx, rx) = oneshot::channel();
        handle
            .send(TableMessage::JoinTable {
                player_id: id.into(),
                username: Username::new(id),
                response: tx,
            })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn summary(handle: &TableHandle) -> TableSummary {
        let (tx, rx) = oneshot::channel();
        handle
            .send(TableMessage::GetSummary { response: tx })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_join_and_summary() {
        let (handle, _registry) = spawn_room(TableConfig::default());
        assert!(join(&handle, "alice").await.is_success());
        let summary = summary(&handle).await;
        assert_eq!(summary.player_count, 1);
        assert_eq!(summary.phase, Phase::Betting);
    }

    #[tokio::test]
    async fn test_rejected_command_reports_error() {
        let (handle, _registry) = spawn_room(TableConfig::default());
        join(&handle, "alice").await;
        let response = command(&handle, "alice", Command::Hit).await;
        assert_eq!(
            response,
            TableResponse::Rejected(TableError::InvalidPhase(Phase::Betting))
        );
    }

    #[tokio::test]
    async fn test_subscriber_receives_current_view() {
        let (handle, _registry) = spawn_room(TableConfig::default());
        join(&handle, "alice").await;
        let (tx, mut rx) = mpsc::channel(8);
        handle
            .send(TableMessage::Subscribe {
                player_id: "alice".into(),
                sender: tx,
            })
            .await
            .unwrap();
        match rx.recv().await {
            Some(StateChangeNotification::StateChanged(view)) => {
                assert_eq!(view.players.len(), 1);
            }
            other => panic!("unexpected notification: {other:?}"),
        }

        command(&handle, "alice", Command::PlaceBet(50)).await;
        match rx.recv().await {
            Some(StateChangeNotification::StateChanged(view)) => {
                assert_eq!(view.players[0].chips, 950);
            }
            other => panic!("unexpected notification: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregistered_room_is_never_reset() {
        let config = TableConfig {
            reset_delay_ms: 100,
            ..TableConfig::default()
        };
        // The room never gets registered, so its timer finds nothing.
        let (handle, _registry) = spawn_room(config);
        join(&handle, "alice").await;
        command(&handle, "alice", Command::PlaceBet(100)).await;
        command(&handle, "alice", Command::StartRound).await;
        // Play until the round settles.
        for _ in 0..12 {
            if summary(&handle).await.phase == Phase::Payout {
                break;
            }
            command(&handle, "alice", Command::Insurance(false)).await;
            command(&handle, "alice", Command::Stand).await;
        }
        assert_eq!(summary(&handle).await.phase, Phase::Payout);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(summary(&handle).await.phase, Phase::Payout);
    }
}
