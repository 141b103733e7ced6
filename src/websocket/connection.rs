//! Per-connection attach/receive/detach loop (spec §4.6.1, §4.7, §4.8).
//!
//! Grounded in the teacher's `handle_socket` split-socket idiom (spawn an outbound writer
//! task, drive inbound frames in this one) — generalised from app-id/SDK authentication to
//! the room/lobby attach protocol, and from the teacher's batching writer down to
//! `sending::run_writer` (nothing in this spec calls for batched frames).

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::auth::AuthenticatedIdentity;
use crate::metrics::ServerMetrics;
use crate::protocol::error_codes::{close_codes, ErrorCode, ErrorPayload};
use crate::protocol::messages::{ClientMessage, ServerMessage};
use crate::protocol::types::{ConnectionRole, PlayerId};
use crate::room::RoomHandle;
use crate::server::AppState;

use super::sending;

/// Attaches `identity` to the global lobby and runs the connection until the socket closes.
/// The lobby pushes its own initial snapshot to `tx` as part of attaching.
pub async fn run_lobby_connection(socket: WebSocket, state: Arc<AppState>, identity: AuthenticatedIdentity) {
    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::channel::<ServerMessage>(state.config.websocket.outbound_queue_capacity);
    let capacity_probe = tx.clone();
    let errors = tx.clone();

    ServerMetrics::inc(&state.metrics.connections_total);
    ServerMetrics::inc(&state.metrics.connections_active);

    let writer = tokio::spawn(sending::run_writer(sink, rx, capacity_probe, state.metrics.clone()));

    state
        .lobby
        .attach(identity.player_id, identity.display_name.clone(), tx)
        .await;

    receive_loop(stream, &state, identity.player_id, &errors, Target::Lobby).await;

    state.lobby.detach(identity.player_id).await;
    let _ = writer.await;
    ServerMetrics::dec(&state.metrics.connections_active);
}

/// Resolves `raw_code`, attaches to the room under `requested_role`, and runs the
/// connection until the socket closes. Rejects with the spec §6 close codes before ever
/// spawning an outbound writer when the room can't be resolved or the attach is refused.
pub async fn run_room_connection(
    mut socket: WebSocket,
    state: Arc<AppState>,
    raw_code: String,
    identity: AuthenticatedIdentity,
    requested_role: ConnectionRole,
) {
    let Some(code) = state.room_code_from_raw(&raw_code) else {
        close_with(&mut socket, close_codes::ROOM_NOT_FOUND, "room not found").await;
        return;
    };
    let Some(room) = state.get_room(&code) else {
        close_with(&mut socket, close_codes::ROOM_NOT_FOUND, "room not found").await;
        return;
    };

    if state.rate_limiter.check_join_attempt(&identity.player_id.0).await.is_err() {
        close_with(&mut socket, close_codes::ROOM_FULL, "rate limited").await;
        return;
    }

    let (mut sink, stream) = socket.split();
    let (tx, rx) = mpsc::channel::<ServerMessage>(state.config.websocket.outbound_queue_capacity);
    let capacity_probe = tx.clone();
    let errors = tx.clone();

    let snapshot = match room
        .attach(
            identity.player_id,
            identity.display_name.clone(),
            identity.avatar_seed.clone(),
            requested_role,
            tx.clone(),
        )
        .await
    {
        Ok(snapshot) => snapshot,
        Err(err) => {
            let close_code = match err {
                ErrorCode::RoomFull | ErrorCode::SpectatorsDisallowed => close_codes::ROOM_FULL,
                _ => close_codes::ROOM_NOT_FOUND,
            };
            let _ = sink
                .send(Message::Close(Some(CloseFrame {
                    code: close_code,
                    reason: err.description().into(),
                })))
                .await;
            return;
        }
    };

    ServerMetrics::inc(&state.metrics.connections_total);
    ServerMetrics::inc(&state.metrics.connections_active);

    // No peer can observe `tx` before this point: the actor only inserts it into its
    // outbound map after `attach` replies, so sending the reconciliation snapshot now is
    // guaranteed to be this connection's first frame.
    let _ = tx.send(ServerMessage::RoomState(Box::new(snapshot))).await;

    let writer = tokio::spawn(sending::run_writer(sink, rx, capacity_probe, state.metrics.clone()));

    receive_loop(
        stream,
        &state,
        identity.player_id,
        &errors,
        Target::Room(room.clone()),
    )
    .await;

    room.detach(identity.player_id).await;
    let _ = writer.await;
    ServerMetrics::dec(&state.metrics.connections_active);
}

enum Target {
    Lobby,
    Room(RoomHandle),
}

/// Drives inbound frames for one connection until the socket closes. Malformed frames and
/// dispatch errors produce an `error` event on this connection only, via `errors` — the
/// socket is never closed on a client-caused error (spec §4.6.9, §7 propagation policy).
async fn receive_loop(
    mut stream: futures_util::stream::SplitStream<WebSocket>,
    state: &Arc<AppState>,
    player_id: PlayerId,
    errors: &mpsc::Sender<ServerMessage>,
    target: Target,
) {
    let max_message_size = state.config.security.max_message_size;

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(%player_id, error = %err, "websocket read error");
                break;
            }
        };

        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => continue,
        };

        if text.len() > max_message_size {
            ServerMetrics::inc(&state.metrics.validation_errors);
            let _ = errors.send(ServerMessage::Error(ErrorPayload::new(ErrorCode::InvalidPayload))).await;
            continue;
        }

        let message: ClientMessage = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(%player_id, error = %err, "rejected malformed frame");
                ServerMetrics::inc(&state.metrics.validation_errors);
                let _ = errors.send(ServerMessage::Error(ErrorPayload::new(ErrorCode::UnknownType))).await;
                continue;
            }
        };

        if let (Target::Lobby, ClientMessage::RoomCreate { max_players, allow_spectators }) =
            (&target, &message)
        {
            let reply = handle_room_create(state, player_id, *max_players, *allow_spectators).await;
            match reply {
                Ok(code) => {
                    let _ = errors.send(ServerMessage::RoomCreated { code }).await;
                }
                Err(code) => {
                    ServerMetrics::inc(&state.metrics.validation_errors);
                    let _ = errors.send(ServerMessage::Error(ErrorPayload::new(code))).await;
                }
            }
            continue;
        }

        let result = match &target {
            Target::Lobby => state.lobby.dispatch(player_id, message).await,
            Target::Room(room) => room.dispatch(player_id, message).await,
        };

        if let Err(code) = result {
            ServerMetrics::inc(&state.metrics.validation_errors);
            let _ = errors.send(ServerMessage::Error(ErrorPayload::new(code))).await;
        }
    }
}

/// Handles `room.create` directly at the connection layer: the lobby actor owns no
/// reference to the room registry, and room creation is a registry operation on
/// `AppState`, not an actor-owned mutation (spec §4.1 room-code generator + §4.8
/// "resolve the target actor").
async fn handle_room_create(
    state: &Arc<AppState>,
    host_id: PlayerId,
    max_players: u8,
    allow_spectators: bool,
) -> Result<crate::protocol::types::RoomCode, ErrorCode> {
    state
        .rate_limiter
        .check_room_creation(&host_id.0)
        .await
        .map_err(|_| ErrorCode::RateLimited)?;
    state.create_room(host_id, max_players, allow_spectators)
}

async fn close_with(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}
