/// Integration tests for the room registry and table actors
///
/// These tests cover lazy room creation, closing empty rooms, broadcast
/// subscriptions and the payout reset timer, using tokio's paused clock.
use party_blackjack::{
    TableError,
    entities::{Phase, PlayerId},
    table::{
        Command, ManagerError, StateChangeNotification, TableConfig, TableManager, TableResponse,
    },
};
use std::time::Duration;
use tokio::sync::mpsc;

fn manager() -> TableManager {
    TableManager::new(TableConfig::default()).unwrap()
}

async fn join(manager: &TableManager, room: &str, player: &str) -> TableResponse {
    manager
        .join_table(room, PlayerId::from(player), player.into(), false)
        .await
        .unwrap()
}

async fn phase(manager: &TableManager, room: &str) -> Phase {
    manager.get_summary(room).await.unwrap().phase
}

/// Bets, deals and stands until the round is settled.
async fn play_round(manager: &TableManager, room: &str, player: &str) {
    let send = move |command| manager.send_command(room, PlayerId::from(player), command);
    assert!(send(Command::PlaceBet(100)).await.unwrap().is_success());
    assert!(send(Command::StartRound).await.unwrap().is_success());
    for _ in 0..4 {
        match phase(manager, room).await {
            Phase::Insurance => {
                send(Command::Insurance(false)).await.unwrap();
            }
            Phase::Playing => {
                send(Command::Stand).await.unwrap();
            }
            _ => break,
        }
    }
    assert_eq!(phase(manager, room).await, Phase::Payout);
}

#[tokio::test]
async fn test_first_join_creates_room() {
    let manager = manager();
    assert_eq!(manager.active_table_count().await, 0);

    assert!(join(&manager, "lobby", "alice").await.is_success());
    assert!(join(&manager, "lobby", "bob").await.is_success());
    assert!(join(&manager, "other", "carol").await.is_success());

    assert_eq!(manager.active_table_count().await, 2);
    let rooms = manager.list_tables().await;
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].name, "lobby");
    assert_eq!(rooms[0].player_count, 2);
    assert_eq!(rooms[1].name, "other");
}

#[tokio::test]
async fn test_shared_flag_only_applies_on_creation() {
    let manager = manager();
    manager
        .join_table("party", "alice".into(), "alice".into(), true)
        .await
        .unwrap();
    manager
        .join_table("party", "bob".into(), "bob".into(), false)
        .await
        .unwrap();
    assert!(manager.get_summary("party").await.unwrap().shared_mode);
}

#[tokio::test]
async fn test_duplicate_join_rejected() {
    let manager = manager();
    join(&manager, "lobby", "alice").await;
    assert_eq!(
        join(&manager, "lobby", "alice").await,
        TableResponse::Rejected(TableError::PlayerAlreadyExists)
    );
}

#[tokio::test]
async fn test_full_room_rejects_join() {
    let manager = TableManager::new(TableConfig {
        max_players: 1,
        ..TableConfig::default()
    })
    .unwrap();
    join(&manager, "solo", "alice").await;
    assert_eq!(
        join(&manager, "solo", "bob").await,
        TableResponse::Rejected(TableError::RoomFull)
    );
    assert_eq!(manager.get_summary("solo").await.unwrap().player_count, 1);
}

#[tokio::test]
async fn test_last_leave_closes_room() {
    let manager = manager();
    join(&manager, "lobby", "alice").await;
    join(&manager, "lobby", "bob").await;

    let response = manager.leave_table("lobby", "alice".into()).await.unwrap();
    assert_eq!(
        response,
        TableResponse::Left {
            remaining_players: 1
        }
    );
    assert_eq!(manager.active_table_count().await, 1);

    manager.leave_table("lobby", "bob".into()).await.unwrap();
    assert_eq!(manager.active_table_count().await, 0);
    assert_eq!(
        manager.get_view("lobby").await,
        Err(ManagerError::RoomNotFound("lobby".to_string()))
    );
}

#[tokio::test]
async fn test_command_to_missing_room() {
    let manager = manager();
    let result = manager
        .send_command("nowhere", "alice".into(), Command::Hit)
        .await;
    assert_eq!(result, Err(ManagerError::RoomNotFound("nowhere".to_string())));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let result = TableManager::new(TableConfig {
        num_decks: 0,
        ..TableConfig::default()
    });
    assert!(matches!(result, Err(ManagerError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_subscribers_see_every_change() {
    let manager = manager();
    join(&manager, "lobby", "alice").await;

    let (tx, mut rx) = mpsc::channel(16);
    manager.subscribe("lobby", "alice".into(), tx).await.unwrap();
    let Some(StateChangeNotification::StateChanged(view)) = rx.recv().await else {
        panic!("expected the current view on subscribe");
    };
    assert_eq!(view.players[0].chips, 1000);

    manager
        .send_command("lobby", "alice".into(), Command::PlaceBet(250))
        .await
        .unwrap();
    let Some(StateChangeNotification::StateChanged(view)) = rx.recv().await else {
        panic!("expected a view after the bet");
    };
    assert_eq!(view.players[0].chips, 750);
    assert_eq!(view.players[0].hands[0].bet, 250);
}

#[tokio::test]
async fn test_rejected_command_is_not_broadcast() {
    let manager = manager();
    join(&manager, "lobby", "alice").await;
    let (tx, mut rx) = mpsc::channel(16);
    manager.subscribe("lobby", "alice".into(), tx).await.unwrap();
    rx.recv().await.unwrap();

    let response = manager
        .send_command("lobby", "alice".into(), Command::Stand)
        .await
        .unwrap();
    assert!(!response.is_success());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_view_redacts_what_snapshot_shows() {
    let manager = manager();
    join(&manager, "lobby", "alice").await;
    let send = |command| manager.send_command("lobby", "alice".into(), command);
    send(Command::PlaceBet(100)).await.unwrap();
    send(Command::StartRound).await.unwrap();

    let view = manager.get_view("lobby").await.unwrap();
    let snapshot = manager.get_snapshot("lobby").await.unwrap();
    assert_eq!(snapshot.dealer_hand.len(), 2);
    if view.phase.hides_hole_card() {
        assert_eq!(view.dealer.cards[1], None);
    } else {
        assert_eq!(view.dealer.cards[1], Some(snapshot.dealer_hand.cards()[1]));
    }
}

#[tokio::test(start_paused = true)]
async fn test_payout_resets_after_delay() {
    let manager = manager();
    join(&manager, "lobby", "alice").await;
    play_round(&manager, "lobby", "alice").await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(phase(&manager, "lobby").await, Phase::Payout);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(phase(&manager, "lobby").await, Phase::Betting);
    let view = manager.get_view("lobby").await.unwrap();
    assert!(view.last_result.is_none());
    assert!(view.dealer.cards.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reset_timer_for_deleted_room_is_noop() {
    let manager = manager();
    join(&manager, "lobby", "alice").await;
    play_round(&manager, "lobby", "alice").await;
    manager.leave_table("lobby", "alice".into()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(manager.active_table_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stale_timer_does_not_reset_recreated_room() {
    let manager = manager();
    join(&manager, "lobby", "alice").await;
    play_round(&manager, "lobby", "alice").await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    manager.leave_table("lobby", "alice".into()).await.unwrap();
    join(&manager, "lobby", "alice").await;
    play_round(&manager, "lobby", "alice").await;

    // The first room's timer fires here and must leave the new room alone.
    tokio::time::sleep(Duration::from_millis(5500)).await;
    assert_eq!(phase(&manager, "lobby").await, Phase::Payout);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(phase(&manager, "lobby").await, Phase::Betting);
}
