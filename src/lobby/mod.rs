//! GlobalLobby actor (C7): presence, room directory, invites, join-requests, global chat.
//!
//! Single instance per deployment, addressed by a well-known handle (spec §4.7) — the same
//! single-writer actor-over-`mpsc` idiom as [`crate::room`]'s `GameRoom`, generalised from
//! a per-match scope to a process-wide one.

pub mod directory;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::alarm_queue::{AlarmKind, AlarmQueue};
use crate::chat_log::ChatLog;
use crate::config::{LobbyConfig, ProtocolConfig};
use crate::metrics::ServerMetrics;
use crate::protocol::error_codes::ErrorCode;
use crate::protocol::messages::{
    ChatKind, ChatPayload, ClientMessage, InviteReceivedPayload, JoinRequestOutcome,
    JoinRequestReceivedPayload, JoinRequestResolvedPayload, OnlineUserView, OnlineUsersPayload,
    PresencePayload, RoomUpdateAction, RoomUpdatePayload, RoomsSnapshotPayload, ServerMessage,
};
use crate::protocol::types::{ChatMessageId, InviteId, PlayerId, RequestId, RoomCode, RoomDirectoryStatus};
use crate::room::{PresenceUpdate, RoomStatusUpdate};
use crate::storage::{namespace, Storage};

use directory::RoomDirectory;

type OutboundSender = mpsc::Sender<ServerMessage>;

/// A pending room invite (spec §4.7 invite broker).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InviteEntry {
    id: InviteId,
    inviter_id: PlayerId,
    invitee_id: PlayerId,
    room_code: RoomCode,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// A pending request to join a room (spec §4.7 join-request broker).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JoinRequestEntry {
    id: RequestId,
    requester_id: PlayerId,
    room_code: RoomCode,
    host_id: PlayerId,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

struct OnlineEntry {
    display_name: String,
}

enum LobbyCommand {
    Attach {
        player_id: PlayerId,
        display_name: String,
        outbound: OutboundSender,
        reply: oneshot::Sender<()>,
    },
    Detach {
        player_id: PlayerId,
    },
    Dispatch {
        player_id: PlayerId,
        message: ClientMessage,
        reply: oneshot::Sender<Result<(), ErrorCode>>,
    },
}

/// Cheap-clone handle to the running [`spawn`]ed lobby actor.
#[derive(Clone)]
pub struct LobbyHandle {
    tx: mpsc::Sender<LobbyCommand>,
}

impl LobbyHandle {
    pub async fn attach(&self, player_id: PlayerId, display_name: String, outbound: OutboundSender) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(LobbyCommand::Attach {
                player_id,
                display_name,
                outbound,
                reply: reply_tx,
            })
            .await;
        let _ = reply_rx.await;
    }

    pub async fn detach(&self, player_id: PlayerId) {
        let _ = self.tx.send(LobbyCommand::Detach { player_id }).await;
    }

    pub async fn dispatch(&self, player_id: PlayerId, message: ClientMessage) -> Result<(), ErrorCode> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(LobbyCommand::Dispatch {
                player_id,
                message,
                reply: reply_tx,
            })
            .await;
        reply_rx.await.unwrap_or(Err(ErrorCode::Internal))
    }
}

struct LobbyActor {
    directory: RoomDirectory,
    chat: ChatLog,
    alarms: AlarmQueue,
    online: HashMap<PlayerId, OnlineEntry>,
    in_room: HashSet<PlayerId>,
    invites: HashMap<InviteId, InviteEntry>,
    join_requests: HashMap<RequestId, JoinRequestEntry>,
    active_request_by_requester: HashMap<PlayerId, RequestId>,
    outbound: HashMap<PlayerId, OutboundSender>,
    config: LobbyConfig,
    protocol: ProtocolConfig,
    storage: Arc<dyn Storage>,
    metrics: Arc<ServerMetrics>,
}

/// Spawns the single global lobby actor. Returns a handle for connection attach/dispatch
/// plus the two sender halves every `GameRoom` is given at `room::spawn` time so it can
/// report directory and presence changes (spec §4.6.1 step 6, §4.6.7).
pub fn spawn(
    config: LobbyConfig,
    protocol: ProtocolConfig,
    storage: Arc<dyn Storage>,
    metrics: Arc<ServerMetrics>,
) -> (LobbyHandle, mpsc::Sender<RoomStatusUpdate>, mpsc::Sender<PresenceUpdate>) {
    let (tx, rx) = mpsc::channel(256);
    let (status_tx, status_rx) = mpsc::channel(256);
    let (presence_tx, presence_rx) = mpsc::channel(256);
    let actor = LobbyActor {
        directory: RoomDirectory::new(storage.clone()),
        chat: ChatLog::new(config.chat_log_capacity),
        alarms: AlarmQueue::new(),
        online: HashMap::new(),
        in_room: HashSet::new(),
        invites: HashMap::new(),
        join_requests: HashMap::new(),
        active_request_by_requester: HashMap::new(),
        outbound: HashMap::new(),
        config,
        protocol,
        storage,
        metrics,
    };
    tokio::spawn(actor.run(rx, status_rx, presence_rx));
    (LobbyHandle { tx }, status_tx, presence_tx)
}

/// Deterministic mapping from a room code to the `Uuid` key `AlarmQueue` needs for a
/// `DirectoryPrune` alarm — the code itself still travels in `metadata` for lookup at fire
/// time, this value only needs to be a stable per-code key for upsert/cancel.
fn directory_prune_key(code: &RoomCode) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, code.as_str().as_bytes())
}

impl LobbyActor {
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<LobbyCommand>,
        mut status_rx: mpsc::Receiver<RoomStatusUpdate>,
        mut presence_rx: mpsc::Receiver<PresenceUpdate>,
    ) {
        loop {
            let deadline = self.alarms.next_deadline();
            let sleep = match deadline {
                Some(at) => {
                    let delta = (at - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO);
                    tokio::time::sleep(delta)
                }
                None => tokio::time::sleep(std::time::Duration::from_secs(3600)),
            };
            tokio::select! {
                _ = sleep, if deadline.is_some() => {
                    self.process_due_alarms().await;
                }
                cmd = rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                Some(update) = status_rx.recv() => {
                    self.handle_room_status(update).await;
                }
                Some(update) = presence_rx.recv() => {
                    self.handle_presence_update(update).await;
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: LobbyCommand) {
        match cmd {
            LobbyCommand::Attach {
                player_id,
                display_name,
                outbound,
                reply,
            } => {
                self.handle_attach(player_id, display_name, outbound).await;
                let _ = reply.send(());
            }
            LobbyCommand::Detach { player_id } => {
                self.handle_detach(player_id).await;
            }
            LobbyCommand::Dispatch {
                player_id,
                message,
                reply,
            } => {
                let result = self.handle_dispatch(player_id, message).await;
                let _ = reply.send(result);
            }
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        for tx in self.outbound.values() {
            let _ = tx.try_send(message.clone());
        }
    }

    fn send_to(&self, player_id: PlayerId, message: ServerMessage) {
        if let Some(tx) = self.outbound.get(&player_id) {
            let _ = tx.try_send(message);
        }
    }

    async fn persist_alarms(&self) {
        if let Ok(value) = serde_json::to_value(self.alarms.pending()) {
            let _ = self.storage.put(namespace::LOBBY_ALARM_QUEUE, "alarms", value).await;
        }
    }

    async fn persist_invites(&self) {
        if let Ok(value) = serde_json::to_value(&self.invites) {
            let _ = self.storage.put(namespace::INVITES, "invites", value).await;
        }
    }

    async fn persist_join_requests(&self) {
        if let Ok(value) = serde_json::to_value(&self.join_requests) {
            let _ = self
                .storage
                .put(namespace::JOIN_REQUESTS, "join_requests", value)
                .await;
        }
    }

    async fn handle_attach(&mut self, player_id: PlayerId, display_name: String, outbound: OutboundSender) {
        self.online.insert(player_id, OnlineEntry { display_name });
        self.outbound.insert(player_id, outbound.clone());

        let rooms = self
            .directory
            .get_public()
            .await
            .into_iter()
            .map(|entry| entry.to_view())
            .collect();
        let _ = outbound.try_send(ServerMessage::Rooms(RoomsSnapshotPayload { rooms }));
        let _ = outbound.try_send(ServerMessage::OnlineUsers(OnlineUsersPayload {
            users: self.online_users_view(),
        }));

        self.broadcast_presence();
    }

    async fn handle_detach(&mut self, player_id: PlayerId) {
        self.online.remove(&player_id);
        self.outbound.remove(&player_id);
        self.broadcast_presence();
    }

    fn online_users_view(&self) -> Vec<OnlineUserView> {
        self.online
            .iter()
            .map(|(id, entry)| OnlineUserView {
                player_id: *id,
                display_name: entry.display_name.clone(),
                in_room: self.in_room.contains(id),
            })
            .collect()
    }

    /// Broadcasts aggregate counts only — the enumerated roster is privacy-sensitive and
    /// only sent on demand, at attach (spec §4.7 "counts only, for privacy").
    fn broadcast_presence(&self) {
        self.broadcast(ServerMessage::Presence(PresencePayload {
            online_count: self.online.len(),
            in_room_count: self.in_room.len(),
        }));
    }

    async fn handle_presence_update(&mut self, update: PresenceUpdate) {
        if update.in_room {
            self.in_room.insert(update.player_id);
        } else {
            self.in_room.remove(&update.player_id);
        }
        self.broadcast_presence();
    }

    async fn handle_room_status(&mut self, update: RoomStatusUpdate) {
        let code = update.code.clone();
        let status = update.status;
        let entry = self.directory.upsert(update).await;
        self.broadcast(ServerMessage::RoomUpdate(RoomUpdatePayload {
            action: RoomUpdateAction::Updated,
            room: entry.to_view(),
        }));

        let now = Utc::now();
        let key = directory_prune_key(&code);
        match status {
            RoomDirectoryStatus::Finished | RoomDirectoryStatus::Closed => {
                self.alarms.schedule(
                    AlarmKind::DirectoryPrune,
                    Some(key),
                    now + Duration::seconds(self.config.directory_stale_threshold_secs as i64),
                    Some(serde_json::json!(code.as_str())),
                    now,
                );
            }
            _ => {
                self.alarms.cancel(AlarmKind::DirectoryPrune, Some(key));
            }
        }
        self.persist_alarms().await;
    }

    async fn handle_dispatch(&mut self, player_id: PlayerId, message: ClientMessage) -> Result<(), ErrorCode> {
        match message {
            ClientMessage::Invite { invitee_id, room_code } => {
                self.handle_invite(player_id, invitee_id, room_code).await
            }
            ClientMessage::InviteResponse { invite_id, accept } => {
                self.handle_invite_response(player_id, invite_id, accept).await
            }
            ClientMessage::RequestJoin { room_code } => {
                self.handle_request_join(player_id, room_code).await
            }
            ClientMessage::CancelJoinRequest { request_id } => {
                self.handle_cancel_join_request(player_id, request_id).await
            }
            ClientMessage::ApproveJoinRequest { request_id } => {
                self.handle_resolve_join_request(player_id, request_id, JoinRequestOutcome::Approved)
                    .await
            }
            ClientMessage::DeclineJoinRequest { request_id } => {
                self.handle_resolve_join_request(player_id, request_id, JoinRequestOutcome::Declined)
                    .await
            }
            ClientMessage::Chat { content } => {
                self.handle_chat(player_id, content, ChatKind::User).await
            }
            ClientMessage::QuickChat { phrase_id } => {
                self.handle_chat(player_id, phrase_id, ChatKind::Quick).await
            }
            ClientMessage::Reaction { emoji } => {
                self.broadcast(ServerMessage::Reaction { player_id, emoji });
                Ok(())
            }
            ClientMessage::TypingStart | ClientMessage::TypingStop => Ok(()),
            _ => Err(ErrorCode::InvalidAction),
        }
    }

    async fn handle_invite(
        &mut self,
        inviter_id: PlayerId,
        invitee_id: PlayerId,
        room_code: RoomCode,
    ) -> Result<(), ErrorCode> {
        let entry = self.directory.get(&room_code).await.ok_or(ErrorCode::RoomNotFound)?;
        if entry.host_id != inviter_id {
            return Err(ErrorCode::InvalidAction);
        }
        let now = Utc::now();
        let invite = InviteEntry {
            id: InviteId::new(),
            inviter_id,
            invitee_id,
            room_code,
            created_at: now,
            expires_at: now + Duration::seconds(self.config.invite_ttl_secs as i64),
        };
        self.alarms
            .schedule(AlarmKind::InviteExpiration, Some(invite.id.0), invite.expires_at, None, now);
        self.invites.insert(invite.id, invite.clone());
        self.persist_invites().await;
        self.persist_alarms().await;
        ServerMetrics::inc(&self.metrics.invites_issued);
        self.send_to(
            invitee_id,
            ServerMessage::InviteReceived(InviteReceivedPayload {
                invite_id: invite.id,
                room_code: invite.room_code,
                inviter_id,
                expires_at: invite.expires_at,
            }),
        );
        Ok(())
    }

    /// Double-accept/double-decline is a no-op (spec §4.7): a missing invite id simply
    /// means it already resolved, so this returns `Ok` rather than an error.
    async fn handle_invite_response(
        &mut self,
        player_id: PlayerId,
        invite_id: InviteId,
        accept: bool,
    ) -> Result<(), ErrorCode> {
        let Some(invite) = self.invites.get(&invite_id).cloned() else {
            return Ok(());
        };
        if invite.invitee_id != player_id {
            return Err(ErrorCode::InvalidAction);
        }
        self.invites.remove(&invite_id);
        self.alarms.cancel(AlarmKind::InviteExpiration, Some(invite_id.0));
        self.persist_invites().await;
        self.persist_alarms().await;
        if accept {
            ServerMetrics::inc(&self.metrics.invites_accepted);
        }
        Ok(())
    }

    async fn expire_invite(&mut self, invite_id: InviteId) {
        if self.invites.remove(&invite_id).is_some() {
            self.persist_invites().await;
            ServerMetrics::inc(&self.metrics.invites_expired);
        }
    }

    async fn handle_request_join(&mut self, requester_id: PlayerId, room_code: RoomCode) -> Result<(), ErrorCode> {
        if self.active_request_by_requester.contains_key(&requester_id) {
            return Err(ErrorCode::InvalidAction);
        }
        let entry = self.directory.get(&room_code).await.ok_or(ErrorCode::RoomNotFound)?;
        let now = Utc::now();
        let request = JoinRequestEntry {
            id: RequestId::new(),
            requester_id,
            room_code,
            host_id: entry.host_id,
            created_at: now,
            expires_at: now + Duration::seconds(self.config.join_request_ttl_secs as i64),
        };
        self.alarms.schedule(
            AlarmKind::JoinRequestExpiration,
            Some(request.id.0),
            request.expires_at,
            None,
            now,
        );
        self.active_request_by_requester.insert(requester_id, request.id);
        self.join_requests.insert(request.id, request.clone());
        self.persist_join_requests().await;
        self.persist_alarms().await;
        ServerMetrics::inc(&self.metrics.join_requests_issued);
        self.send_to(
            requester_id,
            ServerMessage::JoinRequestSent {
                request_id: request.id,
                expires_at: request.expires_at,
            },
        );
        self.send_to(
            entry.host_id,
            ServerMessage::JoinRequestReceived(JoinRequestReceivedPayload {
                request_id: request.id,
                requester_id,
                room_code: request.room_code,
                expires_at: request.expires_at,
            }),
        );
        Ok(())
    }

    /// Client-initiated and idempotent (spec §4.7): cancelling a request that no longer
    /// exists (already resolved/expired) is a no-op rather than an error.
    async fn handle_cancel_join_request(
        &mut self,
        requester_id: PlayerId,
        request_id: RequestId,
    ) -> Result<(), ErrorCode> {
        let Some(request) = self.join_requests.get(&request_id) else {
            return Ok(());
        };
        if request.requester_id != requester_id {
            return Err(ErrorCode::InvalidAction);
        }
        self.join_requests.remove(&request_id);
        self.active_request_by_requester.remove(&requester_id);
        self.alarms.cancel(AlarmKind::JoinRequestExpiration, Some(request_id.0));
        self.persist_join_requests().await;
        self.persist_alarms().await;
        Ok(())
    }

    async fn handle_resolve_join_request(
        &mut self,
        host_id: PlayerId,
        request_id: RequestId,
        outcome: JoinRequestOutcome,
    ) -> Result<(), ErrorCode> {
        let Some(request) = self.join_requests.get(&request_id).cloned() else {
            return Err(ErrorCode::Expired);
        };
        if request.host_id != host_id {
            return Err(ErrorCode::InvalidAction);
        }
        self.join_requests.remove(&request_id);
        self.active_request_by_requester.remove(&request.requester_id);
        self.alarms.cancel(AlarmKind::JoinRequestExpiration, Some(request_id.0));
        self.persist_join_requests().await;
        self.persist_alarms().await;
        match outcome {
            JoinRequestOutcome::Approved => ServerMetrics::inc(&self.metrics.join_requests_approved),
            JoinRequestOutcome::Declined => ServerMetrics::inc(&self.metrics.join_requests_declined),
            JoinRequestOutcome::Expired | JoinRequestOutcome::Cancelled => {}
        }
        self.send_to(
            request.requester_id,
            ServerMessage::JoinRequestResolved(JoinRequestResolvedPayload { request_id, outcome }),
        );
        Ok(())
    }

    async fn expire_join_request(&mut self, request_id: RequestId) {
        let Some(request) = self.join_requests.remove(&request_id) else {
            return;
        };
        self.active_request_by_requester.remove(&request.requester_id);
        self.persist_join_requests().await;
        ServerMetrics::inc(&self.metrics.join_requests_expired);
        self.send_to(
            request.requester_id,
            ServerMessage::JoinRequestResolved(JoinRequestResolvedPayload {
                request_id,
                outcome: JoinRequestOutcome::Expired,
            }),
        );
    }

    async fn prune_directory(&mut self, code: RoomCode) {
        if let Some(entry) = self.directory.get(&code).await {
            self.broadcast(ServerMessage::RoomUpdate(RoomUpdatePayload {
                action: RoomUpdateAction::Closed,
                room: entry.to_view(),
            }));
        }
        self.directory.remove(&code).await;
    }

    async fn handle_chat(
        &mut self,
        player_id: PlayerId,
        content: String,
        kind: ChatKind,
    ) -> Result<(), ErrorCode> {
        crate::protocol::validation::validate_chat_message(&content, &self.protocol)?;
        let display_name = self
            .online
            .get(&player_id)
            .map(|entry| entry.display_name.clone())
            .unwrap_or_else(|| "player".to_string());
        let payload = ChatPayload {
            id: ChatMessageId::new(),
            player_id: Some(player_id),
            display_name,
            content,
            timestamp: Utc::now(),
            kind,
        };
        self.chat.push(payload.clone());
        if let Ok(value) = serde_json::to_value(self.chat.history()) {
            let _ = self.storage.put(namespace::GLOBAL_CHAT, "history", value).await;
        }
        self.broadcast(ServerMessage::Chat(payload));
        Ok(())
    }

    async fn process_due_alarms(&mut self) {
        let now = Utc::now();
        let due = self.alarms.process_due(now);
        self.persist_alarms().await;
        for alarm in due {
            match alarm.kind {
                AlarmKind::InviteExpiration => {
                    if let Some(uuid) = alarm.target_id {
                        self.expire_invite(InviteId(uuid)).await;
                    }
                }
                AlarmKind::JoinRequestExpiration => {
                    if let Some(uuid) = alarm.target_id {
                        self.expire_join_request(RequestId(uuid)).await;
                    }
                }
                AlarmKind::DirectoryPrune => {
                    if let Some(code) = alarm.metadata.as_ref().and_then(|v| v.as_str()) {
                        self.prune_directory(RoomCode(code.to_string())).await;
                    }
                }
                AlarmKind::SeatExpiration
                | AlarmKind::TurnTimeout
                | AlarmKind::AfkCheck
                | AlarmKind::PauseTimeout
                | AlarmKind::RoomCleanup
                | AlarmKind::AiTurnTimeout => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use tokio::sync::mpsc;

    fn test_lobby() -> (LobbyHandle, mpsc::Sender<RoomStatusUpdate>, mpsc::Sender<PresenceUpdate>) {
        spawn(
            LobbyConfig::default(),
            ProtocolConfig::default(),
            Arc::new(InMemoryStorage::new()),
            Arc::new(ServerMetrics::new()),
        )
    }

    async fn attach(lobby: &LobbyHandle, player_id: PlayerId, name: &str) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(32);
        lobby.attach(player_id, name.to_string(), tx).await;
        rx
    }

    #[tokio::test]
    async fn attach_sends_initial_snapshot() {
        let (lobby, _status, _presence) = test_lobby();
        let mut rx = attach(&lobby, PlayerId::new(), "Alex").await;
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ServerMessage::Rooms(_)));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, ServerMessage::OnlineUsers(_)));
    }

    #[tokio::test]
    async fn invite_requires_host() {
        let (lobby, status, _presence) = test_lobby();
        let host = PlayerId::new();
        let impostor = PlayerId::new();
        let invitee = PlayerId::new();
        let code = RoomCode("ABCDEF".to_string());
        status
            .send(RoomStatusUpdate {
                code: code.clone(),
                status: RoomDirectoryStatus::Waiting,
                player_count: 1,
                spectator_count: 0,
                host_id: host,
                is_public: true,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        tokio::task::yield_now().await;

        let result = lobby
            .dispatch(
                impostor,
                ClientMessage::Invite {
                    invitee_id: invitee,
                    room_code: code.clone(),
                },
            )
            .await;
        assert_eq!(result, Err(ErrorCode::InvalidAction));

        let result = lobby
            .dispatch(host, ClientMessage::Invite { invitee_id: invitee, room_code: code })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn join_request_then_approve_resolves_requester() {
        let (lobby, status, _presence) = test_lobby();
        let host = PlayerId::new();
        let requester = PlayerId::new();
        let code = RoomCode("ABCDEF".to_string());
        status
            .send(RoomStatusUpdate {
                code: code.clone(),
                status: RoomDirectoryStatus::Waiting,
                player_count: 1,
                spectator_count: 0,
                host_id: host,
                is_public: true,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        tokio::task::yield_now().await;

        let mut requester_rx = attach(&lobby, requester, "Requester").await;
        // drain the attach snapshot
        requester_rx.recv().await.unwrap();
        requester_rx.recv().await.unwrap();

        lobby
            .dispatch(requester, ClientMessage::RequestJoin { room_code: code.clone() })
            .await
            .unwrap();
        let sent = requester_rx.recv().await.unwrap();
        let request_id = match sent {
            ServerMessage::JoinRequestSent { request_id, .. } => request_id,
            other => panic!("unexpected message: {other:?}"),
        };

        // A second concurrent request from the same requester is rejected.
        let second = lobby
            .dispatch(requester, ClientMessage::RequestJoin { room_code: code })
            .await;
        assert_eq!(second, Err(ErrorCode::InvalidAction));

        lobby
            .dispatch(host, ClientMessage::ApproveJoinRequest { request_id })
            .await
            .unwrap();
        let resolved = requester_rx.recv().await.unwrap();
        assert!(matches!(
            resolved,
            ServerMessage::JoinRequestResolved(JoinRequestResolvedPayload {
                outcome: JoinRequestOutcome::Approved,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn cancel_join_request_is_idempotent() {
        let (lobby, _status, _presence) = test_lobby();
        let requester = PlayerId::new();
        let result = lobby
            .dispatch(requester, ClientMessage::CancelJoinRequest { request_id: RequestId::new() })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn presence_counts_reflect_attach_and_room_updates() {
        let (lobby, _status, presence) = test_lobby();
        let player = PlayerId::new();
        let mut rx = attach(&lobby, player, "Alex").await;
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        let snapshot = rx.recv().await.unwrap();
        assert!(matches!(
            snapshot,
            ServerMessage::Presence(PresencePayload { online_count: 1, in_room_count: 0 })
        ));

        presence
            .send(PresenceUpdate { player_id: player, in_room: true })
            .await
            .unwrap();
        let updated = rx.recv().await.unwrap();
        assert!(matches!(
            updated,
            ServerMessage::Presence(PresencePayload { online_count: 1, in_room_count: 1 })
        ));
    }
}
