//! HTTP/WebSocket API for the blackjack server.
//!
//! Players connect one WebSocket per seat; everything a player does at the
//! table travels over that socket. The REST routes are read-only.
//!
//! # Modules
//!
//! - [`rooms`]: Room listing and the redacted view of a single room
//! - [`websocket`]: Player sessions (join on connect, commands, broadcasts)
//!
//! # Endpoints Overview
//!
//! - `GET /health` - Server health status
//! - `GET /api/v1/rooms` - List live rooms
//! - `GET /api/v1/rooms/{room}` - Redacted view of one room
//! - `GET /ws/{room}?name=<display>&shared=<bool>` - Player session
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pb_server::api::{create_router, AppState};
//! use party_blackjack::table::TableManager;
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let state = AppState {
//!     table_manager: Arc::new(TableManager::default()),
//! };
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod rooms;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use party_blackjack::table::TableManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub table_manager: Arc<TableManager>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// ```text
/// GET  /health                         - Health check
/// GET  /api/v1/rooms                   - List rooms
/// GET  /api/v1/rooms/{room}            - Room view
/// GET  /ws/{room}?name=&shared=        - WebSocket session
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/rooms", get(rooms::list_rooms))
        .route("/rooms/{room}", get(rooms::get_room));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws/{room}", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","version":"0.1.0","rooms":{"active_count":2},"timestamp":"2026-10-19T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let room_count = state.table_manager.active_table_count().await;

    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": {
            "active_count": room_count
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(response))
}
