//! GameRoom actor (C6): seats, reconnection, turn FSM, AFK/pause, spectators, chat.
//!
//! Single-writer actor per spec §6 "Shared resource policy": the only mutator of a
//! room's state is the task spawned by [`spawn`]; everything else reaches it through
//! [`RoomHandle`]'s addressed commands. Grounded in the teacher's actor-over-`mpsc`
//! dispatch idiom (`src/server.rs`'s message-router loop), generalised from a relay
//! fan-out to the room/turn/alarm domain described in spec §4.6.

pub mod state;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rng;
use tokio::sync::{mpsc, oneshot};

use crate::alarm_queue::{AlarmKind, AlarmQueue};
use crate::chat_log::ChatLog;
use crate::config::{ProtocolConfig, RoomConfig};
use crate::engine::{self, Category};
use crate::metrics::ServerMetrics;
use crate::protocol::error_codes::ErrorCode;
use crate::protocol::messages::{
    CategoryScoredPayload, ChatKind, ChatPayload, ClientMessage, DiceKeptPayload,
    DiceRolledPayload, GameCompletedPayload, GameStartedPayload, PlayerConnectionPayload,
    PlayerForfeitedPayload, PlayerJoinedPayload, PlayerLeftPayload, PlayerRemovedPayload,
    PlayerSummary, RankingEntry, RemovalReason, RoomStatePayload, ServerMessage, SkipReason,
    SpectatorJoinedPayload, SpectatorKibitzVotePayload, SpectatorPredictionPayload,
    SpectatorQueueUpdatePayload, SpectatorRootingPayload, TurnEndedPayload, TurnSkippedPayload,
    TurnStartedPayload,
};
use crate::protocol::types::{ChatMessageId, ConnectionRole, PlayerId, RoomCode, RoomDirectoryStatus};
use crate::storage::{namespace, Storage};

use state::{PlayerGameState, Room, RoomLifecycle, RoomSettings, Seat, TurnPhase};

/// Upserted to the lobby's `RoomDirectory` whenever a room's externally-visible summary
/// changes (spec §4.6.7, §6 `Room → Lobby.roomStatus`).
#[derive(Debug, Clone)]
pub struct RoomStatusUpdate {
    pub code: RoomCode,
    pub status: RoomDirectoryStatus,
    pub player_count: u8,
    pub spectator_count: usize,
    pub host_id: PlayerId,
    pub is_public: bool,
    pub updated_at: DateTime<Utc>,
}

/// Notifies the lobby's presence tracker that a player's socket into this room went up
/// or down (spec §4.6.1 step 6, §4.6.2: "notify GlobalLobby of presence change").
#[derive(Debug, Clone, Copy)]
pub struct PresenceUpdate {
    pub player_id: PlayerId,
    pub in_room: bool,
}

type OutboundSender = mpsc::Sender<ServerMessage>;

enum RoomCommand {
    Attach {
        player_id: PlayerId,
        display_name: String,
        avatar_seed: String,
        requested_role: ConnectionRole,
        outbound: OutboundSender,
        reply: oneshot::Sender<Result<RoomStatePayload, ErrorCode>>,
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

/// Cheap-clone handle to a running [`spawn`]ed room actor.
#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub async fn attach(
        &self,
        player_id: PlayerId,
        display_name: String,
        avatar_seed: String,
        requested_role: ConnectionRole,
        outbound: OutboundSender,
    ) -> Result<RoomStatePayload, ErrorCode> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(RoomCommand::Attach {
                player_id,
                display_name,
                avatar_seed,
                requested_role,
                outbound,
                reply: reply_tx,
            })
            .await;
        reply_rx.await.unwrap_or(Err(ErrorCode::Internal))
    }

    pub async fn detach(&self, player_id: PlayerId) {
        let _ = self.tx.send(RoomCommand::Detach { player_id }).await;
    }

    pub async fn dispatch(
        &self,
        player_id: PlayerId,
        message: ClientMessage,
    ) -> Result<(), ErrorCode> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(RoomCommand::Dispatch {
                player_id,
                message,
                reply: reply_tx,
            })
            .await;
        reply_rx.await.unwrap_or(Err(ErrorCode::Internal))
    }
}

struct RoomActor {
    room: Room,
    chat: ChatLog,
    alarms: AlarmQueue,
    outbound: HashMap<PlayerId, OutboundSender>,
    config: RoomConfig,
    protocol: ProtocolConfig,
    storage: Arc<dyn Storage>,
    metrics: Arc<ServerMetrics>,
    directory_sink: mpsc::Sender<RoomStatusUpdate>,
    presence_sink: mpsc::Sender<PresenceUpdate>,
}

/// Spawns a room actor and returns a handle to it. `on_closed` fires once, with the
/// room's code, when the actor's command loop exits (so the caller's registry can evict
/// it) — the `RoomCleanup` alarm is the normal trigger.
pub fn spawn(
    code: RoomCode,
    host_id: PlayerId,
    config: RoomConfig,
    protocol: ProtocolConfig,
    allow_spectators: bool,
    max_players: u8,
    storage: Arc<dyn Storage>,
    metrics: Arc<ServerMetrics>,
    directory_sink: mpsc::Sender<RoomStatusUpdate>,
    presence_sink: mpsc::Sender<PresenceUpdate>,
    on_closed: mpsc::Sender<RoomCode>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(64);
    let now = Utc::now();
    let settings = RoomSettings::from_config(&config, max_players, allow_spectators);
    let room = Room::new(code, host_id, settings, now);
    let actor = RoomActor {
        chat: ChatLog::new(config.chat_log_capacity),
        room,
        alarms: AlarmQueue::new(),
        outbound: HashMap::new(),
        config,
        protocol,
        storage,
        metrics,
        directory_sink,
        presence_sink,
    };
    tokio::spawn(actor.run(rx, on_closed));
    RoomHandle { tx }
}

impl RoomActor {
    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>, on_closed: mpsc::Sender<RoomCode>) {
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
            }
            if self.room.state == RoomLifecycle::Abandoned
                && self.alarms.pending().is_empty()
            {
                break;
            }
        }
        let _ = on_closed.send(self.room.code.clone()).await;
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Attach {
                player_id,
                display_name,
                avatar_seed,
                requested_role,
                outbound,
                reply,
            } => {
                let result = self
                    .handle_attach(player_id, display_name, avatar_seed, requested_role, &outbound)
                    .await;
                if result.is_ok() {
                    self.outbound.insert(player_id, outbound);
                }
                let _ = reply.send(result);
            }
            RoomCommand::Detach { player_id } => {
                self.handle_detach(player_id).await;
            }
            RoomCommand::Dispatch {
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

    async fn persist(&self) {
        if let Ok(value) = serde_json::to_value(&self.room) {
            let _ = self.storage.put(namespace::ROOM, self.room.code.as_str(), value).await;
        }
        if let Ok(value) = serde_json::to_value(self.alarms.pending()) {
            let _ = self
                .storage
                .put(namespace::ALARM_QUEUE, self.room.code.as_str(), value)
                .await;
        }
    }

    async fn handle_attach(
        &mut self,
        player_id: PlayerId,
        display_name: String,
        avatar_seed: String,
        requested_role: ConnectionRole,
        _outbound: &OutboundSender,
    ) -> Result<RoomStatePayload, ErrorCode> {
        let now = Utc::now();

        if let Some(seat) = self.room.seats.get_mut(&player_id) {
            seat.mark_reconnected();
            self.alarms.cancel(AlarmKind::SeatExpiration, Some(player_id.0));
            ServerMetrics::inc(&self.metrics.reconnections_succeeded);
            self.broadcast(ServerMessage::PlayerConnection(PlayerConnectionPayload {
                player_id,
                is_connected: true,
                reconnect_deadline: None,
            }));
            self.notify_presence(player_id, true).await;
            if self.room.state == RoomLifecycle::Paused
                && self.room.current_player_id() == Some(player_id)
            {
                self.room.state = RoomLifecycle::Playing;
                let remaining = self.room.paused_remaining_secs.take().unwrap_or(
                    self.room.settings.turn_timeout_secs as i64,
                );
                self.arm_turn_timeout(Duration::seconds(remaining));
            }
            self.persist().await;
            return Ok(self.snapshot(player_id, ConnectionRole::Player));
        }

        match requested_role {
            ConnectionRole::Player => {
                if self.room.state != RoomLifecycle::Waiting {
                    return Err(ErrorCode::InvalidAction);
                }
                if !self.room.has_open_seat() {
                    return Err(ErrorCode::RoomFull);
                }
                let is_host = self.room.seats.is_empty();
                let seat = Seat {
                    player_id,
                    display_name: display_name.clone(),
                    avatar_seed,
                    turn_order: self.room.next_turn_order(),
                    is_host,
                    connected: true,
                    disconnected_at: None,
                    reconnect_deadline: None,
                    joined_at: now,
                };
                self.room.seats.insert(player_id, seat.clone());
                self.persist().await;
                self.broadcast(ServerMessage::PlayerJoined(PlayerJoinedPayload {
                    player: self.summary_for(&seat),
                }));
                self.push_system_chat(format!("{display_name} joined the room")).await;
                self.report_directory_status().await;
                self.notify_presence(player_id, true).await;
                Ok(self.snapshot(player_id, ConnectionRole::Player))
            }
            ConnectionRole::Spectator => {
                if !self.room.settings.allow_spectators {
                    return Err(ErrorCode::SpectatorsDisallowed);
                }
                self.room.spectators.insert(player_id);
                self.room
                    .spectator_info
                    .insert(player_id, (display_name.clone(), avatar_seed.clone()));
                self.persist().await;
                self.broadcast(ServerMessage::SpectatorJoined(SpectatorJoinedPayload {
                    player_id,
                    display_name: display_name.clone(),
                }));
                self.push_system_chat(format!("{display_name} joined as a spectator")).await;
                self.notify_presence(player_id, true).await;
                Ok(self.snapshot(player_id, ConnectionRole::Spectator))
            }
        }
    }

    async fn handle_detach(&mut self, player_id: PlayerId) {
        self.outbound.remove(&player_id);
        let now = Utc::now();

        if self.room.spectators.remove(&player_id) {
            self.room.spectator_info.remove(&player_id);
            self.room.spectator_queue.retain(|id| *id != player_id);
            self.notify_presence(player_id, false).await;
            return;
        }

        let Some(seat) = self.room.seats.get_mut(&player_id) else {
            return;
        };
        seat.mark_disconnected(now, Duration::seconds(self.config.reconnect_window_secs as i64));
        let deadline = seat.reconnect_deadline.expect("just set above");
        self.alarms.schedule(
            AlarmKind::SeatExpiration,
            Some(player_id.0),
            deadline,
            None,
            now,
        );
        self.broadcast(ServerMessage::PlayerConnection(PlayerConnectionPayload {
            player_id,
            is_connected: false,
            reconnect_deadline: Some(deadline),
        }));

        if self.room.current_player_id() == Some(player_id)
            && self.room.state == RoomLifecycle::Playing
        {
            self.alarms.schedule(
                AlarmKind::PauseTimeout,
                Some(player_id.0),
                now + Duration::seconds(self.config.pause_debounce_secs as i64),
                None,
                now,
            );
        }
        self.persist().await;
        self.report_directory_status().await;
        self.notify_presence(player_id, false).await;
    }

    /// Explicit `room.leave` (spec §4.1, §6): distinct from a socket drop — the player
    /// means to leave now, so there is no reconnection grace. A seat in `waiting`/`starting`
    /// is dropped outright (turn_order renumbered); a seat in `playing`/`paused` forfeits
    /// immediately, forcing a score if it was their turn.
    async fn handle_intentional_leave(&mut self, player_id: PlayerId) {
        let now = Utc::now();

        if self.room.spectators.remove(&player_id) {
            self.room.spectator_info.remove(&player_id);
            self.room.spectator_queue.retain(|id| *id != player_id);
            self.notify_presence(player_id, false).await;
            return;
        }

        let Some(display_name) = self.room.seats.get(&player_id).map(|s| s.display_name.clone())
        else {
            return;
        };
        self.alarms.cancel(AlarmKind::SeatExpiration, Some(player_id.0));
        self.alarms.cancel(AlarmKind::PauseTimeout, Some(player_id.0));

        if self.room.player_order.is_empty() {
            self.room.seats.remove(&player_id);
            self.room.renumber_turn_orders();
            self.broadcast(ServerMessage::PlayerLeft(PlayerLeftPayload { player_id }));
            self.push_system_chat(format!("{display_name} left the room")).await;
            self.promote_from_queue().await;
        } else {
            let was_current = self.room.current_player_id() == Some(player_id);
            self.room.forfeited.insert(player_id);
            self.broadcast(ServerMessage::PlayerLeft(PlayerLeftPayload { player_id }));
            self.broadcast(ServerMessage::PlayerForfeited(PlayerForfeitedPayload { player_id }));
            self.push_system_chat(format!("{display_name} left and forfeited the game")).await;
            if was_current && matches!(self.room.state, RoomLifecycle::Playing | RoomLifecycle::Paused) {
                self.force_timeout_score(player_id).await;
            }
            let remaining_active = self
                .room
                .player_order
                .iter()
                .filter(|id| !self.room.forfeited.contains(*id))
                .count();
            if remaining_active < 2 && self.room.state != RoomLifecycle::Completed {
                self.room.state = RoomLifecycle::Abandoned;
                self.alarms.schedule(
                    AlarmKind::RoomCleanup,
                    None,
                    now + Duration::seconds(self.config.cleanup_window_secs as i64),
                    None,
                    now,
                );
            }
        }
        self.persist().await;
        self.report_directory_status().await;
        self.notify_presence(player_id, false).await;
    }

    /// Best-effort: the lobby may not be running (e.g. in a unit test harness), so a
    /// closed channel is not a room-level error.
    async fn notify_presence(&self, player_id: PlayerId, in_room: bool) {
        let _ = self
            .presence_sink
            .send(PresenceUpdate { player_id, in_room })
            .await;
    }

    async fn handle_dispatch(
        &mut self,
        player_id: PlayerId,
        message: ClientMessage,
    ) -> Result<(), ErrorCode> {
        match message {
            ClientMessage::RoomLeave => {
                self.handle_intentional_leave(player_id).await;
                Ok(())
            }
            ClientMessage::GameStart => self.handle_game_start(player_id).await,
            ClientMessage::GameRematch => self.handle_game_rematch(player_id).await,
            ClientMessage::DiceRoll { kept } => self.handle_dice_roll(player_id, kept).await,
            ClientMessage::DiceKeep { indices } => self.handle_dice_keep(player_id, indices).await,
            ClientMessage::CategoryScore { category } => {
                self.handle_category_score(player_id, category).await
            }
            ClientMessage::Chat { content } => {
                self.handle_chat(player_id, content, ChatKind::User).await
            }
            ClientMessage::QuickChat { phrase_id } => {
                self.handle_chat(player_id, phrase_id, ChatKind::Quick).await
            }
            ClientMessage::TypingStart | ClientMessage::TypingStop | ClientMessage::Reaction { .. } => {
                Ok(())
            }
            ClientMessage::SpectatorQueueJoin => {
                if !self.room.spectators.contains(&player_id) {
                    return Err(ErrorCode::InvalidAction);
                }
                if !self.room.spectator_queue.contains(&player_id) {
                    self.room.spectator_queue.push(player_id);
                }
                self.notify_queue_positions();
                self.persist().await;
                Ok(())
            }
            ClientMessage::SpectatorQueueLeave => {
                self.room.spectator_queue.retain(|id| *id != player_id);
                self.notify_queue_positions();
                self.persist().await;
                Ok(())
            }
            ClientMessage::SpectatorPredict { player_id: target, category } => {
                if !self.room.spectators.contains(&player_id) {
                    return Err(ErrorCode::InvalidAction);
                }
                if !self.room.seats.contains_key(&target) {
                    return Err(ErrorCode::InvalidPayload);
                }
                self.broadcast(ServerMessage::SpectatorPrediction(SpectatorPredictionPayload {
                    spectator_id: player_id,
                    player_id: target,
                    category,
                }));
                Ok(())
            }
            ClientMessage::SpectatorRoot { player_id: target } => {
                if !self.room.spectators.contains(&player_id) {
                    return Err(ErrorCode::InvalidAction);
                }
                if !self.room.seats.contains_key(&target) {
                    return Err(ErrorCode::InvalidPayload);
                }
                self.broadcast(ServerMessage::SpectatorRooting(SpectatorRootingPayload {
                    spectator_id: player_id,
                    player_id: target,
                }));
                Ok(())
            }
            ClientMessage::SpectatorKibitzVote { vote } => {
                if !self.room.spectators.contains(&player_id) {
                    return Err(ErrorCode::InvalidAction);
                }
                self.broadcast(ServerMessage::SpectatorKibitzVote(SpectatorKibitzVotePayload {
                    spectator_id: player_id,
                    vote,
                }));
                Ok(())
            }
            _ => Err(ErrorCode::InvalidAction),
        }
    }

    async fn handle_game_start(&mut self, player_id: PlayerId) -> Result<(), ErrorCode> {
        if self.room.host_id != player_id {
            return Err(ErrorCode::InvalidAction);
        }
        if self.room.state != RoomLifecycle::Waiting {
            return Err(ErrorCode::InvalidAction);
        }
        if self.room.seats.len() < 2 {
            return Err(ErrorCode::InvalidAction);
        }

        let mut ordered: Vec<_> = self.room.seats.values().collect();
        ordered.sort_by_key(|s| s.turn_order);
        let player_order: Vec<PlayerId> = ordered.iter().map(|s| s.player_id).collect();

        for id in &player_order {
            self.room.player_games.insert(*id, PlayerGameState::new());
        }
        self.room.player_order = player_order.clone();
        self.room.current_player_index = 0;
        self.room.turn_number = 1;
        self.room.round_number = 1;
        self.room.turn_phase = TurnPhase::Roll;
        self.room.state = RoomLifecycle::Starting;
        let now = Utc::now();
        self.room.started_at = Some(now);

        self.broadcast(ServerMessage::GameStarting);
        self.room.state = RoomLifecycle::Playing;
        self.broadcast(ServerMessage::GameStarted(GameStartedPayload {
            player_order: player_order.clone(),
            started_at: now,
        }));
        self.start_turn(player_order[0], now);
        self.persist().await;
        self.report_directory_status().await;
        Ok(())
    }

    /// Host-only: resets a `Completed` room back to `Waiting` with the same seats so a new
    /// `game.start` can begin a fresh match, per spec §4.1's `game.rematch` command.
    async fn handle_game_rematch(&mut self, player_id: PlayerId) -> Result<(), ErrorCode> {
        if self.room.host_id != player_id {
            return Err(ErrorCode::InvalidAction);
        }
        if self.room.state != RoomLifecycle::Completed {
            return Err(ErrorCode::InvalidAction);
        }
        self.alarms.cancel(AlarmKind::RoomCleanup, None);
        self.room.player_games.clear();
        self.room.player_order.clear();
        self.room.forfeited.clear();
        self.room.current_player_index = 0;
        self.room.turn_number = 0;
        self.room.round_number = 0;
        self.room.turn_phase = TurnPhase::Roll;
        self.room.turn_deadline = None;
        self.room.paused_remaining_secs = None;
        self.room.started_at = None;
        self.room.state = RoomLifecycle::Waiting;
        self.persist().await;
        self.report_directory_status().await;
        Ok(())
    }

    fn start_turn(&mut self, player_id: PlayerId, now: DateTime<Utc>) {
        if let Some(state) = self.room.player_games.get_mut(&player_id) {
            state.reset_for_new_turn();
        }
        self.arm_turn_timeout(Duration::seconds(self.room.settings.turn_timeout_secs as i64));
        self.broadcast(ServerMessage::TurnStarted(TurnStartedPayload {
            player_id,
            turn_number: self.room.turn_number,
            round_number: self.room.round_number,
            turn_timeout_secs: self.room.settings.turn_timeout_secs,
        }));
        let _ = now;
    }

    fn arm_turn_timeout(&mut self, remaining: Duration) {
        let now = Utc::now();
        let Some(current) = self.room.current_player_id() else {
            return;
        };
        if self.room.settings.turn_timeout_secs == 0 {
            return;
        }
        let fires_at = now + remaining;
        self.room.turn_deadline = Some(fires_at);
        self.alarms
            .schedule(AlarmKind::TurnTimeout, Some(current.0), fires_at, None, now);
        let warn_window = Duration::seconds(self.config.afk_warning_window_secs as i64);
        if remaining > warn_window {
            self.alarms.schedule(
                AlarmKind::AfkCheck,
                Some(current.0),
                fires_at - warn_window,
                None,
                now,
            );
        }
    }

    async fn handle_dice_roll(&mut self, player_id: PlayerId, kept: [bool; 5]) -> Result<(), ErrorCode> {
        if self.room.current_player_id() != Some(player_id) {
            return Err(ErrorCode::NotYourTurn);
        }
        let state = self
            .room
            .player_games
            .get_mut(&player_id)
            .ok_or(ErrorCode::InvalidAction)?;
        if state.rolls_remaining == 0 {
            return Err(ErrorCode::InvalidAction);
        }
        let prior = state.kept.unwrap_or([false; 5]);
        if (0..5).any(|i| prior[i] && !kept[i]) {
            return Err(ErrorCode::InvalidPayload);
        }

        let mut rng_source = rng();
        let dice = engine::roll_dice(&mut rng_source, state.current_dice.as_ref(), &kept);
        state.current_dice = Some(dice);
        state.kept = Some(kept);
        state.rolls_remaining -= 1;
        let rolls_remaining = state.rolls_remaining;

        self.room.turn_phase = if rolls_remaining == 0 {
            TurnPhase::Score
        } else {
            TurnPhase::Decide
        };

        self.broadcast(ServerMessage::DiceRolled(DiceRolledPayload {
            player_id,
            dice,
            rolls_remaining,
        }));
        self.persist().await;
        Ok(())
    }

    async fn handle_dice_keep(&mut self, player_id: PlayerId, indices: Vec<u8>) -> Result<(), ErrorCode> {
        if self.room.current_player_id() != Some(player_id) {
            return Err(ErrorCode::NotYourTurn);
        }
        let state = self
            .room
            .player_games
            .get_mut(&player_id)
            .ok_or(ErrorCode::InvalidAction)?;
        if state.rolls_remaining == 0 || state.rolls_remaining >= 3 {
            return Err(ErrorCode::InvalidAction);
        }
        if indices.iter().any(|&i| i >= 5) {
            return Err(ErrorCode::InvalidPayload);
        }

        let mut mask = [false; 5];
        for &i in &indices {
            mask[i as usize] = true;
        }
        let prior = state.kept.unwrap_or([false; 5]);
        if (0..5).any(|i| prior[i] && !mask[i]) {
            return Err(ErrorCode::InvalidPayload);
        }
        state.kept = Some(mask);

        self.broadcast(ServerMessage::DiceKept(DiceKeptPayload {
            player_id,
            kept: mask,
        }));
        self.persist().await;
        Ok(())
    }

    async fn handle_category_score(
        &mut self,
        player_id: PlayerId,
        category: Category,
    ) -> Result<(), ErrorCode> {
        if self.room.current_player_id() != Some(player_id) {
            return Err(ErrorCode::NotYourTurn);
        }
        let dice = {
            let state = self
                .room
                .player_games
                .get(&player_id)
                .ok_or(ErrorCode::InvalidAction)?;
            state.current_dice.ok_or(ErrorCode::InvalidAction)?
        };
        {
            let state = self.room.player_games.get(&player_id).expect("checked above");
            if state.scorecard.get(category).is_some() {
                return Err(ErrorCode::InvalidAction);
            }
        }

        let score = engine::score_category(&dice, category);
        let state = self.room.player_games.get_mut(&player_id).expect("checked above");
        let bonus_awarded = engine::dicee_bonus_awarded(&dice, &state.scorecard);
        state.scorecard.set(category, score);
        if bonus_awarded {
            state.scorecard.add_dicee_bonus(100);
        }
        state.recompute_total();
        let total_score = state.total_score;

        self.broadcast(ServerMessage::CategoryScored(CategoryScoredPayload {
            player_id,
            category,
            score,
            dicee_bonus_awarded: bonus_awarded,
            total_score,
        }));
        self.finish_turn(player_id, category, score).await;
        Ok(())
    }

    async fn finish_turn(&mut self, player_id: PlayerId, category: Category, score: i32) {
        self.alarms.cancel(AlarmKind::TurnTimeout, Some(player_id.0));
        self.alarms.cancel(AlarmKind::AfkCheck, Some(player_id.0));
        self.alarms.cancel(AlarmKind::PauseTimeout, Some(player_id.0));

        let all_complete = self
            .room
            .player_order
            .iter()
            .all(|id| self.room.player_games.get(id).is_some_and(|s| s.scorecard.is_complete()));

        if all_complete {
            self.complete_game().await;
            return;
        }

        self.broadcast(ServerMessage::TurnEnded(TurnEndedPayload {
            player_id,
            category,
            score,
        }));
        self.advance_to_next_player().await;
    }

    async fn advance_to_next_player(&mut self) {
        let participating: Vec<bool> = self
            .room
            .player_order
            .iter()
            .map(|id| !self.room.forfeited.contains(id))
            .collect();
        let (next_index, wrapped) =
            engine::advance_turn(self.room.current_player_index, &participating);
        self.room.current_player_index = next_index;
        self.room.turn_number += 1;
        if wrapped {
            self.room.round_number += 1;
        }
        let next_player = self.room.player_order[next_index];
        let now = Utc::now();
        self.start_turn(next_player, now);
        self.persist().await;
    }

    async fn complete_game(&mut self) {
        self.room.state = RoomLifecycle::Completed;
        let mut rankings: Vec<RankingEntry> = self
            .room
            .player_order
            .iter()
            .map(|id| {
                let state = &self.room.player_games[id];
                RankingEntry {
                    player_id: *id,
                    total_score: state.total_score,
                    dicee_bonus_count: (state.scorecard.dicee_bonus() / 100) as u32,
                    rank: 0,
                }
            })
            .collect();
        let turn_order_of: HashMap<PlayerId, u8> = self
            .room
            .seats
            .values()
            .map(|s| (s.player_id, s.turn_order))
            .collect();
        rankings.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| b.dicee_bonus_count.cmp(&a.dicee_bonus_count))
                .then_with(|| {
                    turn_order_of
                        .get(&a.player_id)
                        .cmp(&turn_order_of.get(&b.player_id))
                })
        });
        for (i, entry) in rankings.iter_mut().enumerate() {
            entry.rank = i as u32 + 1;
        }
        self.broadcast(ServerMessage::GameCompleted(Box::new(GameCompletedPayload {
            rankings,
        })));
        let now = Utc::now();
        if let Some(started_at) = self.room.started_at {
            let duration_ms = (now - started_at).num_milliseconds().max(0) as u64;
            self.room.record_game_duration(duration_ms);
        }
        self.alarms.schedule(
            AlarmKind::RoomCleanup,
            None,
            now + Duration::seconds(self.config.cleanup_window_secs as i64),
            None,
            now,
        );
        self.persist().await;
        self.report_directory_status().await;
        self.promote_from_queue().await;
    }

    /// Pushes a `system`-kind chat entry (spec §4.4: join/leave/timeout/forfeit events are
    /// narrated in room chat, not just via their dedicated `ServerMessage` payloads).
    async fn push_system_chat(&mut self, content: impl Into<String>) {
        let payload = self.chat.system(content, Utc::now());
        self.broadcast(ServerMessage::Chat(payload));
    }

    async fn handle_chat(
        &mut self,
        player_id: PlayerId,
        content: String,
        kind: ChatKind,
    ) -> Result<(), ErrorCode> {
        crate::protocol::validation::validate_chat_message(&content, &self.protocol)?;
        let display_name = self
            .room
            .seats
            .get(&player_id)
            .map(|s| s.display_name.clone())
            .unwrap_or_else(|| "spectator".to_string());
        let payload = ChatPayload {
            id: ChatMessageId::new(),
            player_id: Some(player_id),
            display_name,
            content,
            timestamp: Utc::now(),
            kind,
        };
        self.chat.push(payload.clone());
        self.broadcast(ServerMessage::Chat(payload));
        Ok(())
    }

    async fn process_due_alarms(&mut self) {
        let now = Utc::now();
        let due = self.alarms.process_due(now);
        self.persist().await;
        for alarm in due {
            match alarm.kind {
                AlarmKind::SeatExpiration => {
                    if let Some(player_id) = alarm.target_id.map(PlayerId::from) {
                        self.expire_seat(player_id).await;
                    }
                }
                AlarmKind::TurnTimeout => {
                    if let Some(player_id) = alarm.target_id.map(PlayerId::from) {
                        self.force_timeout_score(player_id).await;
                    }
                }
                AlarmKind::AfkCheck => {
                    if let Some(player_id) = alarm.target_id.map(PlayerId::from) {
                        if self.room.current_player_id() == Some(player_id) {
                            self.send_to(
                                player_id,
                                ServerMessage::PlayerAfkWarning {
                                    seconds_remaining: self.config.afk_warning_window_secs as u32,
                                },
                            );
                        }
                    }
                }
                AlarmKind::PauseTimeout => {
                    if let Some(player_id) = alarm.target_id.map(PlayerId::from) {
                        self.apply_pause(player_id).await;
                    }
                }
                AlarmKind::RoomCleanup => {
                    self.room.state = RoomLifecycle::Abandoned;
                }
                AlarmKind::JoinRequestExpiration
                | AlarmKind::AiTurnTimeout
                | AlarmKind::InviteExpiration
                | AlarmKind::DirectoryPrune => {}
            }
        }
    }

    async fn apply_pause(&mut self, player_id: PlayerId) {
        let Some(seat) = self.room.seats.get(&player_id) else {
            return;
        };
        if seat.connected || self.room.current_player_id() != Some(player_id) {
            return;
        }
        if self.room.state != RoomLifecycle::Playing {
            return;
        }
        self.room.paused_remaining_secs = self
            .room
            .turn_deadline
            .map(|d| (d - Utc::now()).num_seconds().max(0));
        self.alarms.cancel(AlarmKind::TurnTimeout, Some(player_id.0));
        self.room.state = RoomLifecycle::Paused;
        self.persist().await;
    }

    async fn expire_seat(&mut self, player_id: PlayerId) {
        let Some(seat) = self.room.seats.get(&player_id) else {
            return;
        };
        if seat.connected {
            return;
        }
        let display_name = seat.display_name.clone();
        let game_started = !self.room.player_order.is_empty();
        self.room.forfeited.insert(player_id);
        ServerMetrics::inc(&self.metrics.seats_expired);
        if game_started {
            self.broadcast(ServerMessage::PlayerForfeited(PlayerForfeitedPayload { player_id }));
            self.push_system_chat(format!("{display_name} timed out and forfeited the game"))
                .await;
        } else {
            self.broadcast(ServerMessage::PlayerRemoved(PlayerRemovedPayload {
                player_id,
                reason: RemovalReason::Timeout,
            }));
            self.push_system_chat(format!("{display_name} timed out and was removed")).await;
        }

        if self.room.current_player_id() == Some(player_id)
            && matches!(self.room.state, RoomLifecycle::Playing | RoomLifecycle::Paused)
        {
            self.force_timeout_score(player_id).await;
        }

        let remaining_active = self
            .room
            .player_order
            .iter()
            .filter(|id| !self.room.forfeited.contains(*id))
            .count();
        if self.room.player_order.is_empty() {
            // Game never started: just drop the seat, renumber the remaining seats'
            // turn_order (spec §4.6.3), and offer the opening to the warm-seat queue.
            self.room.seats.remove(&player_id);
            self.room.forfeited.remove(&player_id);
            self.room.renumber_turn_orders();
            self.promote_from_queue().await;
        } else if remaining_active < 2 && self.room.state != RoomLifecycle::Completed {
            self.room.state = RoomLifecycle::Abandoned;
            let now = Utc::now();
            self.alarms.schedule(
                AlarmKind::RoomCleanup,
                None,
                now + Duration::seconds(self.config.cleanup_window_secs as i64),
                None,
                now,
            );
        }
        self.persist().await;
        self.report_directory_status().await;
    }

    /// Seats queued spectators into open seats (spec §4.6.8 D8 warm-seat transition):
    /// "the front of the queue is promoted to seats until either the queue or open spots
    /// are exhausted". Runs at `game.completed` (ready for a rematch) and whenever a seat
    /// opens up before a game has started.
    async fn promote_from_queue(&mut self) {
        if !matches!(
            self.room.state,
            RoomLifecycle::Waiting | RoomLifecycle::Completed
        ) {
            return;
        }
        while self.room.has_open_seat() {
            let Some(player_id) = self.room.spectator_queue.first().copied() else {
                break;
            };
            self.room.spectator_queue.remove(0);
            self.room.spectators.remove(&player_id);
            let Some((display_name, avatar_seed)) = self.room.spectator_info.remove(&player_id)
            else {
                continue;
            };
            let now = Utc::now();
            let is_host = self.room.seats.is_empty();
            let seat = Seat {
                player_id,
                display_name,
                avatar_seed,
                turn_order: self.room.next_turn_order(),
                is_host,
                connected: true,
                disconnected_at: None,
                reconnect_deadline: None,
                joined_at: now,
            };
            self.room.seats.insert(player_id, seat.clone());
            self.broadcast(ServerMessage::PlayerJoined(PlayerJoinedPayload {
                player: self.summary_for(&seat),
            }));
        }
        self.notify_queue_positions();
        self.persist().await;
        self.report_directory_status().await;
    }

    /// Sends every still-queued spectator its refreshed position and
    /// `estimated_wait_ms` after a warm-seat promotion shifts the queue (spec §4.6.8).
    fn notify_queue_positions(&self) {
        let average_ms = self.room.rolling_average_game_duration_ms();
        for (index, player_id) in self.room.spectator_queue.iter().enumerate() {
            let position = index as u32 + 1;
            self.send_to(
                *player_id,
                ServerMessage::SpectatorQueueUpdate(SpectatorQueueUpdatePayload {
                    player_id: *player_id,
                    position,
                    estimated_wait_ms: average_ms * position as u64,
                }),
            );
        }
    }

    /// Forces a score into the current player's turn on AFK timeout or forfeiture (spec
    /// §4.6.5 scenario 5, §4.6.3). If a roll happened this turn (`current_dice` is
    /// `Some`), the lowest-scoring still-open category is chosen, enumeration-order
    /// tie-break (`Iterator::min_by_key` keeps the first minimum); a player who never
    /// rolled (forfeited before acting, or timed out at `turn_roll`) has nothing to
    /// evaluate and scores zero into the first open category instead.
    async fn force_timeout_score(&mut self, player_id: PlayerId) {
        if self.room.current_player_id() != Some(player_id) {
            return;
        }
        let display_name = self
            .room
            .seats
            .get(&player_id)
            .map(|s| s.display_name.clone())
            .unwrap_or_else(|| "player".to_string());
        let Some(state) = self.room.player_games.get_mut(&player_id) else {
            return;
        };

        let scored = if let Some(dice) = state.current_dice {
            Category::ALL
                .iter()
                .copied()
                .filter(|&c| state.scorecard.get(c).is_none())
                .map(|c| (c, engine::score_category(&dice, c)))
                .min_by_key(|&(_, score)| score)
        } else {
            engine::first_unscored_category(&state.scorecard).map(|c| (c, 0))
        };

        let Some((category, score)) = scored else {
            self.advance_to_next_player().await;
            return;
        };
        state.scorecard.set(category, score);
        state.recompute_total();

        self.broadcast(ServerMessage::TurnSkipped(TurnSkippedPayload {
            player_id,
            reason: SkipReason::Timeout,
            category_scored: category,
            score,
        }));
        self.push_system_chat(format!(
            "{display_name}'s turn timed out — scored {score} in {category:?}"
        ))
        .await;

        let all_complete = self
            .room
            .player_order
            .iter()
            .all(|id| self.room.player_games.get(id).is_some_and(|s| s.scorecard.is_complete()));
        if all_complete {
            self.complete_game().await;
        } else {
            self.advance_to_next_player().await;
        }
    }

    async fn report_directory_status(&mut self) {
        let status = match self.room.state {
            RoomLifecycle::Waiting | RoomLifecycle::Starting => RoomDirectoryStatus::Waiting,
            RoomLifecycle::Playing | RoomLifecycle::Paused => RoomDirectoryStatus::Playing,
            RoomLifecycle::Completed => RoomDirectoryStatus::Finished,
            RoomLifecycle::Abandoned => RoomDirectoryStatus::Closed,
        };
        let update = RoomStatusUpdate {
            code: self.room.code.clone(),
            status,
            player_count: self.room.seats.len() as u8,
            spectator_count: self.room.spectators.len(),
            host_id: self.room.host_id,
            is_public: self.room.settings.is_public,
            updated_at: Utc::now(),
        };
        let _ = self.directory_sink.send(update).await;
    }

    fn summary_for(&self, seat: &Seat) -> PlayerSummary {
        let total_score = self
            .room
            .player_games
            .get(&seat.player_id)
            .map(|s| s.total_score)
            .unwrap_or(0);
        PlayerSummary {
            player_id: seat.player_id,
            display_name: seat.display_name.clone(),
            avatar_seed: seat.avatar_seed.clone(),
            turn_order: seat.turn_order,
            is_host: seat.is_host,
            connected: seat.connected,
            total_score,
        }
    }

    fn snapshot(&self, player_id: PlayerId, role: ConnectionRole) -> RoomStatePayload {
        let mut players: Vec<PlayerSummary> = self.room.seats.values().map(|s| self.summary_for(s)).collect();
        players.sort_by_key(|p| p.turn_order);

        let current_player_id = self.room.current_player_id();
        let (current_dice, kept, rolls_remaining) = current_player_id
            .and_then(|id| self.room.player_games.get(&id))
            .map(|s| (s.current_dice, s.kept, s.rolls_remaining))
            .unwrap_or((None, None, 3));

        RoomStatePayload {
            code: self.room.code.clone(),
            state: format!("{:?}", self.room.state).to_lowercase(),
            host_id: self.room.host_id,
            your_player_id: player_id,
            your_role: role,
            max_players: self.room.settings.max_players,
            allow_spectators: self.room.settings.allow_spectators,
            players,
            spectator_count: self.room.spectators.len(),
            current_player_id,
            turn_number: self.room.turn_number,
            round_number: self.room.round_number,
            current_dice,
            kept,
            rolls_remaining,
            chat_history: self.chat.history(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use tokio::sync::mpsc;

    fn test_room(max_players: u8, allow_spectators: bool) -> (RoomHandle, PlayerId, mpsc::Receiver<RoomCode>) {
        let host_id = PlayerId::new();
        let (directory_sink, mut directory_rx) = mpsc::channel(64);
        let (presence_sink, mut presence_rx) = mpsc::channel(64);
        let (on_closed, closed_rx) = mpsc::channel(4);
        tokio::spawn(async move { while directory_rx.recv().await.is_some() {} });
        tokio::spawn(async move { while presence_rx.recv().await.is_some() {} });
        let handle = spawn(
            RoomCode("ABCDEF".to_string()),
            host_id,
            RoomConfig {
                default_turn_timeout_secs: 0,
                ..RoomConfig::default()
            },
            ProtocolConfig::default(),
            allow_spectators,
            max_players,
            Arc::new(InMemoryStorage::new()),
            Arc::new(ServerMetrics::new()),
            directory_sink,
            presence_sink,
            on_closed,
        );
        (handle, host_id, closed_rx)
    }

    async fn attach_player(room: &RoomHandle, player_id: PlayerId, name: &str) -> (RoomStatePayload, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(64);
        let snapshot = room
            .attach(player_id, name.to_string(), format!("seed-{name}"), ConnectionRole::Player, tx)
            .await
            .expect("attach should succeed");
        (snapshot, rx)
    }

    #[tokio::test]
    async fn host_attach_seats_as_host() {
        let (room, host_id, _closed) = test_room(4, true);
        let (snapshot, _rx) = attach_player(&room, host_id, "Host").await;
        assert_eq!(snapshot.host_id, host_id);
        assert_eq!(snapshot.players.len(), 1);
        assert!(snapshot.players[0].is_host);
    }

    #[tokio::test]
    async fn room_full_rejects_additional_players() {
        let (room, host_id, _closed) = test_room(2, true);
        let _ = attach_player(&room, host_id, "Host").await;
        let _ = attach_player(&room, PlayerId::new(), "Guest").await;

        let (tx, _rx) = mpsc::channel(8);
        let result = room
            .attach(PlayerId::new(), "Late".to_string(), "seed".to_string(), ConnectionRole::Player, tx)
            .await;
        assert_eq!(result, Err(ErrorCode::RoomFull));
    }

    #[tokio::test]
    async fn spectators_disallowed_when_room_configured_closed() {
        let (room, host_id, _closed) = test_room(4, false);
        let _ = attach_player(&room, host_id, "Host").await;

        let (tx, _rx) = mpsc::channel(8);
        let result = room
            .attach(PlayerId::new(), "Watcher".to_string(), "seed".to_string(), ConnectionRole::Spectator, tx)
            .await;
        assert_eq!(result, Err(ErrorCode::SpectatorsDisallowed));
    }

    #[tokio::test]
    async fn non_host_cannot_start_the_game() {
        let (room, host_id, _closed) = test_room(4, true);
        let (_snapshot, _host_rx) = attach_player(&room, host_id, "Host").await;
        let guest_id = PlayerId::new();
        let (_snapshot, _guest_rx) = attach_player(&room, guest_id, "Guest").await;

        let result = room.dispatch(guest_id, ClientMessage::GameStart).await;
        assert_eq!(result, Err(ErrorCode::InvalidAction));
    }

    #[tokio::test]
    async fn dice_roll_out_of_turn_is_rejected() {
        let (room, host_id, _closed) = test_room(2, true);
        let (_snapshot, mut host_rx) = attach_player(&room, host_id, "Host").await;
        let guest_id = PlayerId::new();
        let (_snapshot, _guest_rx) = attach_player(&room, guest_id, "Guest").await;
        // drain the PlayerJoined the host saw for the guest
        let _ = host_rx.recv().await;

        room.dispatch(host_id, ClientMessage::GameStart).await.unwrap();

        let result = room.dispatch(guest_id, ClientMessage::DiceRoll { kept: [false; 5] }).await;
        assert_eq!(result, Err(ErrorCode::NotYourTurn));
    }

    /// Drives a full two-player game to completion: each turn rolls three times then
    /// scores the first still-open category, alternating turns until every scorecard is
    /// complete and `game.completed` broadcasts.
    #[tokio::test]
    async fn two_player_game_runs_to_completion() {
        let (room, host_id, _closed) = test_room(2, true);
        let (_snapshot, mut host_rx) = attach_player(&room, host_id, "Host").await;
        let guest_id = PlayerId::new();
        let (_snapshot, mut guest_rx) = attach_player(&room, guest_id, "Guest").await;
        let _ = host_rx.recv().await; // PlayerJoined(guest) on the host's channel

        room.dispatch(host_id, ClientMessage::GameStart).await.unwrap();

        let mut turn = 0usize;
        let order = [host_id, guest_id];
        loop {
            let current = order[turn % 2];
            for _ in 0..3 {
                room.dispatch(current, ClientMessage::DiceRoll { kept: [false; 5] })
                    .await
                    .unwrap();
            }
            // Score whichever category the engine hasn't marked yet: Ones is always legal
            // to score (every roll has a score for it, even if zero).
            let result = room
                .dispatch(current, ClientMessage::CategoryScore { category: Category::ALL[turn / 2] })
                .await;
            assert!(result.is_ok(), "turn {turn} scoring failed: {result:?}");
            turn += 1;
            if turn == Category::ALL.len() * 2 {
                break;
            }
        }

        // Drain both channels looking for GameCompleted.
        let mut saw_completed = false;
        while let Ok(msg) = host_rx.try_recv() {
            if matches!(msg, ServerMessage::GameCompleted(_)) {
                saw_completed = true;
            }
        }
        while let Ok(msg) = guest_rx.try_recv() {
            if matches!(msg, ServerMessage::GameCompleted(_)) {
                saw_completed = true;
            }
        }
        assert!(saw_completed, "expected a GameCompleted broadcast");
    }

    #[tokio::test]
    async fn detach_then_reattach_reclaims_the_same_seat() {
        let (room, host_id, _closed) = test_room(2, true);
        let _ = attach_player(&room, host_id, "Host").await;

        room.detach(host_id).await;
        tokio::task::yield_now().await;

        let (snapshot, _rx) = attach_player(&room, host_id, "Host").await;
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].player_id, host_id);
    }
}
