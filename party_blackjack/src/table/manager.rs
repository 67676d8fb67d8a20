//! Table manager for spawning and managing room actors.

use super::{
    actor::{TableActor, TableHandle, TableId},
    config::TableConfig,
    messages::{Command, StateChangeNotification, TableMessage, TableResponse, TableSummary},
};
use crate::game::entities::{PlayerId, RoomSnapshot, RoomView, Username};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use thiserror::Error;
use tokio::sync::{RwLock, mpsc, oneshot};

/// Live rooms keyed by room name.
pub type TableRegistry = Arc<RwLock<HashMap<String, TableHandle>>>;

/// Errors from routing a request to a room
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManagerError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    #[error("room '{0}' is closed")]
    TableClosed(String),
    #[error("invalid table configuration: {0}")]
    InvalidConfig(String),
}

/// Table manager owning the room registry
///
/// Rooms are created on first join and closed when the last player leaves.
/// Joins and leaves hold the registry write lock for their whole round trip
/// to the actor, so a room can't be closed under a concurrent join.
pub struct TableManager {
    /// Configuration applied to every room
    config: TableConfig,

    /// Active table handles
    tables: TableRegistry,

    /// Next table ID
    next_table_id: AtomicU64,
}

impl TableManager {
    /// Create a new table manager
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration for every room this manager creates
    ///
    /// # Returns
    ///
    /// * `Result<TableManager, ManagerError>` - Manager, or the config error
    pub fn new(config: TableConfig) -> Result<Self, ManagerError> {
        config.validate().map_err(ManagerError::InvalidConfig)?;
        Ok(Self {
            config,
            tables: Arc::new(RwLock::new(HashMap::new())),
            next_table_id: AtomicU64::new(1),
        })
    }

    /// Room configuration
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    fn spawn_table(&self, name: &str, shared_mode: bool) -> TableHandle {
        let table_id: TableId = self.next_table_id.fetch_add(1, Ordering::Relaxed);
        let (actor, handle) = TableActor::new(
            table_id,
            name,
            self.config.clone(),
            self.tables.clone(),
            shared_mode,
        );

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!(
            "Created room {} '{}'{}",
            table_id,
            name,
            if shared_mode { " in shared mode" } else { "" }
        );
        handle
    }

    /// Get a table handle
    pub async fn get_table(&self, name: &str) -> Option<TableHandle> {
        let tables = self.tables.read().await;
        tables.get(name).cloned()
    }

    async fn require_table(&self, name: &str) -> Result<TableHandle, ManagerError> {
        self.get_table(name)
            .await
            .ok_or_else(|| ManagerError::RoomNotFound(name.to_string()))
    }

    /// Sends a request and waits for the actor's reply.
    async fn request<T>(
        handle: &TableHandle,
        build: impl FnOnce(oneshot::Sender<T>) -> TableMessage,
    ) -> Result<T, ManagerError> {
        let (tx, rx) = oneshot::channel();
        handle.send(build(tx)).await?;
        rx.await
            .map_err(|_| ManagerError::TableClosed(handle.name().to_string()))
    }

    /// Join a room, creating it if it doesn't exist
    ///
    /// # Arguments
    ///
    /// * `name` - Room name
    /// * `player_id` - Participant ID
    /// * `username` - Display name
    /// * `shared_mode` - Start the room in shared mode; only applies when
    ///   this join creates the room
    ///
    /// # Returns
    ///
    /// * `Result<TableResponse, ManagerError>` - Response or error
    pub async fn join_table(
        &self,
        name: &str,
        player_id: PlayerId,
        username: Username,
        shared_mode: bool,
    ) -> Result<TableResponse, ManagerError> {
        let mut tables = self.tables.write().await;

        let existing = tables.get(name).filter(|h| !h.is_closed()).cloned();
        let (handle, created) = match existing {
            Some(handle) => (handle, false),
            None => {
                let handle = self.spawn_table(name, shared_mode);
                tables.insert(name.to_string(), handle.clone());
                (handle, true)
            }
        };

        let response = Self::request(&handle, |response| TableMessage::JoinTable {
            player_id,
            username,
            response,
        })
        .await?;

        if created && !response.is_success() {
            tables.remove(name);
            let _ = Self::request(&handle, |response| TableMessage::Close { response }).await;
        }

        Ok(response)
    }

    /// Leave a room, closing it if it becomes empty
    ///
    /// # Arguments
    ///
    /// * `name` - Room name
    /// * `player_id` - Participant ID
    ///
    /// # Returns
    ///
    /// * `Result<TableResponse, ManagerError>` - Response or error
    pub async fn leave_table(
        &self,
        name: &str,
        player_id: PlayerId,
    ) -> Result<TableResponse, ManagerError> {
        let mut tables = self.tables.write().await;
        let handle = tables
            .get(name)
            .cloned()
            .ok_or_else(|| ManagerError::RoomNotFound(name.to_string()))?;

        let response = Self::request(&handle, |response| TableMessage::LeaveTable {
            player_id,
            response,
        })
        .await?;

        if let TableResponse::Left {
            remaining_players: 0,
        } = response
        {
            tables.remove(name);
            drop(tables);
            Self::request(&handle, |response| TableMessage::Close { response }).await?;
            log::info!("Room '{name}' is empty, closed");
        }

        Ok(response)
    }

    /// Send a player command to a room
    pub async fn send_command(
        &self,
        name: &str,
        player_id: PlayerId,
        command: Command,
    ) -> Result<TableResponse, ManagerError> {
        let handle = self.require_table(name).await?;
        Self::request(&handle, |response| TableMessage::Command {
            player_id,
            command,
            response,
        })
        .await
    }

    /// Get the broadcastable view of a room
    pub async fn get_view(&self, name: &str) -> Result<RoomView, ManagerError> {
        let handle = self.require_table(name).await?;
        Self::request(&handle, |response| TableMessage::GetView { response }).await
    }

    /// Get the full snapshot of a room, hole card included
    pub async fn get_snapshot(&self, name: &str) -> Result<RoomSnapshot, ManagerError> {
        let handle = self.require_table(name).await?;
        Self::request(&handle, |response| TableMessage::GetSnapshot { response }).await
    }

    /// Get a room's listing entry
    pub async fn get_summary(&self, name: &str) -> Result<TableSummary, ManagerError> {
        let handle = self.require_table(name).await?;
        Self::request(&handle, |response| TableMessage::GetSummary { response }).await
    }

    /// Subscribe to a room's state changes
    pub async fn subscribe(
        &self,
        name: &str,
        player_id: PlayerId,
        sender: mpsc::Sender<StateChangeNotification>,
    ) -> Result<(), ManagerError> {
        let handle = self.require_table(name).await?;
        handle
            .send(TableMessage::Subscribe { player_id, sender })
            .await
    }

    /// Stop receiving a room's state changes
    pub async fn unsubscribe(&self, name: &str, player_id: PlayerId) -> Result<(), ManagerError> {
        let handle = self.require_table(name).await?;
        handle.send(TableMessage::Unsubscribe { player_id }).await
    }

    /// Close a room regardless of who is seated
    pub async fn close_table(&self, name: &str) -> Result<(), ManagerError> {
        let handle = self
            .tables
            .write()
            .await
            .remove(name)
            .ok_or_else(|| ManagerError::RoomNotFound(name.to_string()))?;

        Self::request(&handle, |response| TableMessage::Close { response }).await?;
        log::info!("Closed room '{name}'");
        Ok(())
    }

    /// List all active rooms, sorted by name
    pub async fn list_tables(&self) -> Vec<TableSummary> {
        let handles: Vec<TableHandle> = self.tables.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            match Self::request(&handle, |response| TableMessage::GetSummary { response }).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => log::warn!("Skipping room '{}' in listing: {e}", handle.name()),
            }
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Get active table count
    pub async fn active_table_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.len()
    }
}

impl Default for TableManager {
    fn default() -> Self {
        Self {
            config: TableConfig::default(),
            tables: Arc::new(RwLock::new(HashMap::new())),
            next_table_id: AtomicU64::new(1),
        }
    }
}
