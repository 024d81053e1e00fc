use super::*;
use serde_json::json;
use tokio::time::{Duration, timeout};
use uuid::Uuid;

use crate::room::canvas::Point;
use crate::room::staging::{StrokeStyle, TempId};

async fn recv(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("frame receive timed out")
        .expect("frame channel closed unexpectedly")
}

/// Receive until a frame with `syscall` arrives, skipping everything else.
async fn recv_syscall(rx: &mut mpsc::Receiver<Frame>, syscall: &str) -> Frame {
    loop {
        let frame = recv(rx).await;
        if frame.syscall == syscall {
            return frame;
        }
    }
}

async fn join(registry: &RoomRegistry, key: &str, name: &str) -> (ClientId, mpsc::Receiver<Frame>) {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(64);
    registry
        .add_user(key, User::generate(id, Some(name)), tx)
        .await
        .expect("join should succeed");
    (id, rx)
}

// =============================================================================
// ENSURE / GET
// =============================================================================

#[tokio::test]
async fn ensure_returns_same_room_for_same_key() {
    let registry = RoomRegistry::new(16);
    let (alice, _rx) = join(&registry, "r1", "Alice").await;

    let again = registry.ensure("r1").await;
    let users = again.user_list().await.expect("user list");
    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![alice]);
}

#[tokio::test]
async fn concurrent_ensure_creates_one_room() {
    let registry = RoomRegistry::new(16);
    let mut tasks = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move { join(&registry, "race", &format!("user-{i}")).await.0 }));
    }
    for task in tasks {
        task.await.expect("join task");
    }

    assert_eq!(registry.user_list("race").await.expect("user list").len(), 8);
}

#[tokio::test]
async fn get_does_not_create() {
    let registry = RoomRegistry::new(16);
    assert!(registry.get("nowhere").await.is_none());
    assert!(registry.get("nowhere").await.is_none());

    registry.ensure("somewhere").await;
    assert_eq!(registry.get("somewhere").await.expect("room exists").key(), "somewhere");
}

#[tokio::test]
async fn rooms_are_isolated() {
    let registry = RoomRegistry::new(16);
    let (alice, mut rx_a) = join(&registry, "r1", "Alice").await;
    let (_bob, mut rx_b) = join(&registry, "r2", "Bob").await;

    let handle = registry.ensure("r1").await;
    let temp_id = TempId::from_value(&json!("t")).expect("temp id");
    handle
        .send(RoomCommand::StrokeStart { client_id: alice, temp_id: temp_id.clone(), style: StrokeStyle::default() })
        .await
        .expect("send start");
    handle
        .send(RoomCommand::StrokeEnd { client_id: alice, temp_id })
        .await
        .expect("send end");

    let commit = recv_syscall(&mut rx_a, "op:commit").await;
    assert_eq!(commit.room.as_deref(), Some("r1"));
    assert_eq!(registry.snapshot("r1").await.expect("r1 snapshot").len(), 1);
    assert!(registry.snapshot("r2").await.expect("r2 snapshot").is_empty());

    // Bob only ever sees his own join.
    let frames: Vec<Frame> = std::iter::from_fn(|| rx_b.try_recv().ok()).collect();
    assert!(frames.iter().all(|f| f.room.as_deref() == Some("r2")));
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

#[tokio::test]
async fn user_list_is_in_join_order() {
    let registry = RoomRegistry::new(16);
    let (alice, _rx_a) = join(&registry, "r1", "Alice").await;
    let (bob, _rx_b) = join(&registry, "r1", "Bob").await;
    let (carol, _rx_c) = join(&registry, "r1", "Carol").await;

    let users = registry.user_list("r1").await.expect("user list");
    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![alice, bob, carol]);
    assert_eq!(users[1].name, "Bob");
}

#[tokio::test]
async fn disconnect_removes_user_and_keeps_other_cursor() {
    let registry = RoomRegistry::new(16);
    let (alice, mut rx_a) = join(&registry, "r1", "Alice").await;
    let (bob, _rx_b) = join(&registry, "r1", "Bob").await;

    let handle = registry.ensure("r1").await;
    handle
        .send(RoomCommand::Cursor { client_id: alice, x: 10.0, y: 20.0 })
        .await
        .expect("alice cursor");
    handle
        .send(RoomCommand::Cursor { client_id: bob, x: 1.0, y: 2.0 })
        .await
        .expect("bob cursor");

    registry.remove_user("r1", bob).await.expect("remove bob");

    let users = registry.user_list("r1").await.expect("user list");
    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![alice]);

    let presence = loop {
        let frame = recv_syscall(&mut rx_a, "presence:state").await;
        if !frame.data.contains_key("selfId") && frame.data["users"].as_array().is_some_and(|u| u.len() == 1) {
            break frame;
        }
    };
    assert_eq!(presence.data["users"][0]["id"], json!(alice));

    let (carol, mut rx_c) = join(&registry, "r1", "Carol").await;
    handle
        .send(RoomCommand::Cursor { client_id: carol, x: 5.0, y: 5.0 })
        .await
        .expect("carol cursor");

    let cursors = recv_syscall(&mut rx_c, "cursor:state").await;
    let table = cursors.data["cursors"].as_object().expect("cursor table");
    assert_eq!(table.len(), 2);
    assert_eq!(table[&alice.to_string()]["x"], 10.0);
    assert_eq!(table[&alice.to_string()]["y"], 20.0);
    assert!(!table.contains_key(&bob.to_string()));
}

#[tokio::test]
async fn remove_user_from_unknown_room_is_noop() {
    let registry = RoomRegistry::new(16);
    registry
        .remove_user("ghost", Uuid::new_v4())
        .await
        .expect("unknown room is not an error");
    assert!(registry.get("ghost").await.is_none());
}

#[tokio::test]
async fn remove_non_member_is_noop() {
    let registry = RoomRegistry::new(16);
    let (alice, _rx) = join(&registry, "r1", "Alice").await;

    registry.remove_user("r1", Uuid::new_v4()).await.expect("remove stranger");

    let users = registry.user_list("r1").await.expect("user list");
    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![alice]);
}

#[tokio::test]
async fn empty_room_keeps_history() {
    let registry = RoomRegistry::new(16);
    let (alice, mut rx) = join(&registry, "r1", "Alice").await;
    let handle = registry.ensure("r1").await;
    let temp_id = TempId::from_value(&json!(1)).expect("temp id");
    handle
        .send(RoomCommand::StrokeStart { client_id: alice, temp_id: temp_id.clone(), style: StrokeStyle::default() })
        .await
        .expect("send start");
    handle
        .send(RoomCommand::StrokeEnd { client_id: alice, temp_id })
        .await
        .expect("send end");
    recv_syscall(&mut rx, "op:commit").await;

    registry.remove_user("r1", alice).await.expect("remove alice");
    assert!(registry.user_list("r1").await.expect("user list").is_empty());

    let (_bob, mut rx_b) = join(&registry, "r1", "Bob").await;
    let state = recv_syscall(&mut rx_b, "state:replace").await;
    assert_eq!(state.data["operations"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn rooms_inherit_the_stroke_point_cap() {
    let registry = RoomRegistry::new(16).with_max_stroke_points(1);
    let (alice, mut rx) = join(&registry, "r1", "Alice").await;
    let handle = registry.ensure("r1").await;
    let temp_id = TempId::from_value(&json!(1)).expect("temp id");
    handle
        .send(RoomCommand::StrokeStart { client_id: alice, temp_id: temp_id.clone(), style: StrokeStyle::default() })
        .await
        .expect("send start");
    for x in [1.0, 2.0, 3.0] {
        handle
            .send(RoomCommand::StrokePoint { client_id: alice, temp_id: temp_id.clone(), point: Point { x, y: x } })
            .await
            .expect("send point");
    }
    handle
        .send(RoomCommand::StrokeEnd { client_id: alice, temp_id })
        .await
        .expect("send end");

    let commit = recv_syscall(&mut rx, "op:commit").await;
    assert_eq!(commit.data["op"]["points"], json!([{ "x": 1.0, "y": 1.0 }]));
}

#[tokio::test]
async fn inspection_of_unknown_room_is_not_found() {
    let registry = RoomRegistry::new(16);
    assert!(matches!(registry.user_list("nope").await, Err(RoomError::NotFound(k)) if k == "nope"));
    assert!(matches!(registry.snapshot("nope").await, Err(RoomError::NotFound(_))));
    assert!(registry.get("nope").await.is_none());
}

// =============================================================================
// ROOM KEYS
// =============================================================================

#[test]
fn room_key_strings_are_trimmed() {
    assert_eq!(normalize_room_key(Some(&json!("  r1 "))), "r1");
}

#[test]
fn room_key_numbers_are_stringified() {
    assert_eq!(normalize_room_key(Some(&json!(42))), "42");
}

#[test]
fn room_key_missing_or_blank_is_lobby() {
    assert_eq!(normalize_room_key(None), "lobby");
    assert_eq!(normalize_room_key(Some(&json!(""))), "lobby");
    assert_eq!(normalize_room_key(Some(&json!("   "))), "lobby");
    assert_eq!(normalize_room_key(Some(&json!(null))), "lobby");
    assert_eq!(normalize_room_key(Some(&json!({"id": "r1"}))), "lobby");
}
