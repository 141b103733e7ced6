//! Exercises the wiring `AppState` does that no single module's own unit tests can see:
//! creating a room through the registry and attaching a player to it must surface a
//! `room.update` on every attached lobby connection (spec §4.6.7, §6 `Room → Lobby`).

mod test_helpers;

use dicee_server::protocol::messages::RoomUpdateAction;
use dicee_server::protocol::types::{ConnectionRole, PlayerId};
use dicee_server::protocol::ServerMessage;
use dicee_server::server::AppState;
use test_helpers::fast_config;
use tokio::sync::mpsc;

#[tokio::test]
async fn room_creation_and_attach_surfaces_on_the_lobby_directory() {
    let state = AppState::new(fast_config());

    let observer = PlayerId::new();
    let (tx, mut rx) = mpsc::channel(32);
    state.lobby.attach(observer, "Observer".to_string(), tx).await;
    assert!(matches!(rx.recv().await.unwrap(), ServerMessage::Rooms(_)));
    assert!(matches!(rx.recv().await.unwrap(), ServerMessage::OnlineUsers(_)));
    assert!(matches!(rx.recv().await.unwrap(), ServerMessage::Presence(_)));

    let host_id = PlayerId::new();
    let code = state.create_room(host_id, 2, true).expect("room creation should succeed");
    assert!(state.room_exists(&code));

    let room = state.get_room(&code).expect("room should be registered");
    let (host_tx, _host_rx) = mpsc::channel(32);
    room.attach(host_id, "Host".to_string(), "seed".to_string(), ConnectionRole::Player, host_tx)
        .await
        .expect("host attach should succeed");

    let update = rx.recv().await.expect("expected a room.update broadcast");
    match update {
        ServerMessage::RoomUpdate(payload) => {
            assert_eq!(payload.action, RoomUpdateAction::Updated);
            assert_eq!(payload.room.code, code);
            assert_eq!(payload.room.status, "waiting");
            assert_eq!(payload.room.host_id, host_id);
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn room_code_lookup_rejects_malformed_and_unknown_codes() {
    let state = AppState::new(fast_config());

    assert!(state.room_code_from_raw("not a code").is_none());

    let host_id = PlayerId::new();
    let code = state.create_room(host_id, 4, true).unwrap();
    let looked_up = state
        .room_code_from_raw(&code.as_str().to_lowercase())
        .expect("lowercase code should normalize");
    assert!(state.room_exists(&looked_up));

    let unknown = state.room_code_from_raw("ZZZZZZ");
    if let Some(unknown_code) = unknown {
        assert!(!state.room_exists(&unknown_code));
    }
}

#[tokio::test]
async fn max_players_is_clamped_to_the_configured_ceiling() {
    let mut config = fast_config();
    config.room.max_players_ceiling = 4;
    config.room.min_players = 2;
    let state = AppState::new(config);

    let host_id = PlayerId::new();
    // Request more seats than the ceiling allows; create_room clamps rather than erroring.
    let code = state.create_room(host_id, 250, true).unwrap();
    let room = state.get_room(&code).unwrap();
    let (tx, _rx) = mpsc::channel(8);
    let snapshot = room
        .attach(host_id, "Host".to_string(), "seed".to_string(), ConnectionRole::Player, tx)
        .await
        .unwrap();
    assert_eq!(snapshot.max_players, 4);
}
