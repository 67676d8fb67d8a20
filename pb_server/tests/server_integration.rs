//! Integration tests for the HTTP routes.
//!
//! Tests health, room listing and the redacted room view.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use party_blackjack::{
    entities::{Phase, PlayerId, RoomView},
    table::{Command, TableConfig, TableManager, TableSummary},
};
use pb_server::api::{AppState, create_router};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

/// Helper to create test server with a fresh manager
fn create_test_server() -> (axum::Router, Arc<TableManager>) {
    let table_manager = Arc::new(TableManager::new(TableConfig::default()).unwrap());
    let app = create_router(AppState {
        table_manager: table_manager.clone(),
    });
    (app, table_manager)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn seat(manager: &TableManager, room: &str, player: &str) {
    let response = manager
        .join_table(room, PlayerId::from(player), player.into(), false)
        .await
        .unwrap();
    assert!(response.is_success());
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let (app, manager) = create_test_server();
    seat(&manager, "lobby", "alice").await;

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["rooms"]["active_count"], 1);
    assert!(health["timestamp"].is_string());
}

// ============================================================================
// Room Listing Tests
// ============================================================================

#[tokio::test]
async fn test_list_rooms_empty() {
    let (app, _) = create_test_server();

    let (status, body) = get(app, "/api/v1/rooms").await;
    assert_eq!(status, StatusCode::OK);
    let rooms: Vec<TableSummary> = serde_json::from_slice(&body).unwrap();
    assert!(rooms.is_empty());
}

#[tokio::test]
async fn test_list_rooms_shows_counts_and_phase() {
    let (app, manager) = create_test_server();
    seat(&manager, "beta", "alice").await;
    seat(&manager, "alpha", "bob").await;
    seat(&manager, "alpha", "carol").await;

    let (status, body) = get(app, "/api/v1/rooms").await;
    assert_eq!(status, StatusCode::OK);

    let rooms: Vec<TableSummary> = serde_json::from_slice(&body).unwrap();
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].name, "alpha");
    assert_eq!(rooms[0].player_count, 2);
    assert_eq!(rooms[0].phase, Phase::Betting);
    assert!(!rooms[0].shared_mode);
    assert_eq!(rooms[1].name, "beta");
}

#[tokio::test]
async fn test_get_missing_room_is_404() {
    let (app, _) = create_test_server();

    let (status, body) = get(app, "/api/v1/rooms/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("nowhere"));
}

#[tokio::test]
async fn test_get_room_returns_redacted_view() {
    let (app, manager) = create_test_server();
    seat(&manager, "lobby", "alice").await;
    let send = |command| manager.send_command("lobby", "alice".into(), command);
    send(Command::PlaceBet(100)).await.unwrap();
    send(Command::StartRound).await.unwrap();

    let (status, body) = get(app, "/api/v1/rooms/lobby").await;
    assert_eq!(status, StatusCode::OK);

    let view: RoomView = serde_json::from_slice(&body).unwrap();
    assert_eq!(view.round, 1);
    assert!(view.dealer.cards.len() >= 2);
    if view.phase.hides_hole_card() {
        assert_eq!(view.dealer.cards[1], None);
        assert_eq!(view.players[0].hands[0].bet, 100);
    }
}

// ============================================================================
// Router Tests
// ============================================================================

#[tokio::test]
async fn test_404_for_invalid_endpoint() {
    let (app, _) = create_test_server();

    let (status, _) = get(app, "/api/v1/tables").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_websocket_route_requires_upgrade() {
    let (app, manager) = create_test_server();

    let (status, _) = get(app, "/ws/lobby?name=alice").await;
    assert!(status.is_client_error());
    assert_eq!(manager.active_table_count().await, 0);
}

#[tokio::test]
async fn test_cors_headers_present() {
    let (app, _) = create_test_server();

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://example.com")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS headers should be present"
    );
}
