//! Room listing API handlers.
//!
//! # Examples
//!
//! List all rooms:
//! ```bash
//! curl http://localhost:6969/api/v1/rooms
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use party_blackjack::{
    entities::RoomView,
    table::{ManagerError, TableSummary},
};
use serde_json::{Value, json};

use super::AppState;

/// List all live rooms, sorted by name.
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<TableSummary>> {
    Json(state.table_manager.list_tables().await)
}

/// Get the redacted view of one room.
///
/// The dealer's hole card is hidden exactly as in the WebSocket broadcasts.
pub async fn get_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<RoomView>, (StatusCode, Json<Value>)> {
    match state.table_manager.get_view(&room).await {
        Ok(view) => Ok(Json(view)),
        Err(e @ ManagerError::RoomNotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": e.to_string() })),
        )),
        Err(e) => {
            log::error!("Failed to read room '{room}': {e}");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string() })),
            ))
        }
    }
}
