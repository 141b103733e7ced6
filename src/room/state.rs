//! GameRoom data model (spec §3: Seat, PlayerGameState, Room).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::config::RoomConfig;
use crate::engine::Scorecard;
use crate::protocol::types::{PlayerId, RoomCode};

/// How many of the most recently completed games feed the warm-seat wait estimate
/// (spec §4.6.8: "rolling average of prior game durations").
const GAME_DURATION_SAMPLE_WINDOW: usize = 5;

/// Used for the wait estimate until this room has completed its first game.
const DEFAULT_ESTIMATED_GAME_DURATION_MS: u64 = 10 * 60 * 1000;

/// A seated participant (spec §3 Seat). `0..maxPlayers` per room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub player_id: PlayerId,
    pub display_name: String,
    pub avatar_seed: String,
    pub turn_order: u8,
    pub is_host: bool,
    pub connected: bool,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub reconnect_deadline: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

impl Seat {
    /// Invariant I1: `!connected ⇒ reconnect_deadline.is_some()`.
    pub fn mark_disconnected(&mut self, now: DateTime<Utc>, reconnect_window: chrono::Duration) {
        self.connected = false;
        self.disconnected_at = Some(now);
        self.reconnect_deadline = Some(now + reconnect_window);
    }

    pub fn mark_reconnected(&mut self) {
        self.connected = true;
        self.disconnected_at = None;
        self.reconnect_deadline = None;
    }
}

/// Per-player game state once the game has started (spec §3 PlayerGameState).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerGameState {
    pub scorecard: Scorecard,
    pub current_dice: Option<[u8; 5]>,
    pub kept: Option<[bool; 5]>,
    pub rolls_remaining: u8,
    pub total_score: i32,
}

impl PlayerGameState {
    pub fn new() -> Self {
        Self {
            scorecard: Scorecard::new(),
            current_dice: None,
            kept: None,
            rolls_remaining: 3,
            total_score: 0,
        }
    }

    /// Called at the start of each new turn for this player.
    pub fn reset_for_new_turn(&mut self) {
        self.current_dice = None;
        self.kept = None;
        self.rolls_remaining = 3;
    }

    pub fn recompute_total(&mut self) {
        self.total_score = crate::engine::total_score(&self.scorecard);
    }
}

impl Default for PlayerGameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Room lifecycle state (spec §3 `Room.state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomLifecycle {
    Waiting,
    Starting,
    Playing,
    Paused,
    Completed,
    Abandoned,
}

/// Per-turn sub-state, not itself part of spec §3 but required to drive the turn FSM
/// described in §4.6.4 (`turn_roll` / `turn_decide` / `turn_score`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Roll,
    Decide,
    Score,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    pub is_public: bool,
    pub allow_spectators: bool,
    pub max_players: u8,
    pub turn_timeout_secs: u32,
}

impl RoomSettings {
    pub fn from_config(config: &RoomConfig, max_players: u8, allow_spectators: bool) -> Self {
        Self {
            is_public: true,
            allow_spectators,
            max_players,
            turn_timeout_secs: config.default_turn_timeout_secs as u32,
        }
    }
}

/// The GameRoom's owned state (spec §3 Room + per-player game state, minus chat/alarms
/// which live in their own owned substructures alongside this one in the actor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub code: RoomCode,
    pub settings: RoomSettings,
    pub state: RoomLifecycle,
    pub host_id: PlayerId,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,

    pub seats: HashMap<PlayerId, Seat>,
    pub player_games: HashMap<PlayerId, PlayerGameState>,
    pub spectators: std::collections::HashSet<PlayerId>,
    /// Display name/avatar seed of each connected spectator, kept so a queued spectator
    /// can be promoted into an opened seat without needing to re-attach (spec §4.6.8 D8).
    pub spectator_info: HashMap<PlayerId, (String, String)>,
    /// FIFO warm-seat queue: spectators who asked to be promoted into the next open seat.
    pub spectator_queue: Vec<PlayerId>,

    /// Frozen at `playing` entry; persists even if a player later forfeits (spec §3).
    pub player_order: Vec<PlayerId>,
    pub current_player_index: usize,
    pub turn_number: u32,
    pub round_number: u32,
    pub turn_phase: TurnPhase,
    /// When the current `TurnTimeout` alarm is due to fire, if one is armed.
    pub turn_deadline: Option<DateTime<Utc>>,
    /// Remaining turn budget saved off while `state == paused`, re-armed verbatim on
    /// reconnection of the paused player (spec §4.6.6).
    pub paused_remaining_secs: Option<i64>,

    /// Players who have forfeited (disconnected past their reconnect window while seated).
    pub forfeited: std::collections::HashSet<PlayerId>,

    /// Durations (ms) of the last few completed games, newest last, feeding the
    /// warm-seat queue's `estimated_wait_ms` (spec §4.6.8).
    pub recent_game_durations_ms: VecDeque<u64>,
}

impl Room {
    pub fn new(code: RoomCode, host_id: PlayerId, settings: RoomSettings, now: DateTime<Utc>) -> Self {
        Self {
            code,
            settings,
            state: RoomLifecycle::Waiting,
            host_id,
            created_at: now,
            started_at: None,
            seats: HashMap::new(),
            player_games: HashMap::new(),
            spectators: std::collections::HashSet::new(),
            spectator_info: HashMap::new(),
            spectator_queue: Vec::new(),
            player_order: Vec::new(),
            current_player_index: 0,
            turn_number: 0,
            round_number: 1,
            turn_phase: TurnPhase::Roll,
            turn_deadline: None,
            paused_remaining_secs: None,
            forfeited: std::collections::HashSet::new(),
            recent_game_durations_ms: VecDeque::with_capacity(GAME_DURATION_SAMPLE_WINDOW),
        }
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    pub fn has_open_seat(&self) -> bool {
        self.seat_count() < self.settings.max_players as usize
    }

    pub fn current_player_id(&self) -> Option<PlayerId> {
        if self.state != RoomLifecycle::Playing && self.state != RoomLifecycle::Paused {
            return None;
        }
        self.player_order.get(self.current_player_index).copied()
    }

    /// Invariant I4 check, for tests/assertions at the `playing` transition.
    pub fn playing_invariant_holds(&self) -> bool {
        if self.state != RoomLifecycle::Playing {
            return true;
        }
        self.player_order.len() >= 2 && self.current_player_index < self.player_order.len()
    }

    pub fn next_turn_order(&self) -> u8 {
        self.seats.len() as u8
    }

    /// Records a completed game's duration for the rolling wait estimate, dropping the
    /// oldest sample once the window is full.
    pub fn record_game_duration(&mut self, duration_ms: u64) {
        self.recent_game_durations_ms.push_back(duration_ms);
        while self.recent_game_durations_ms.len() > GAME_DURATION_SAMPLE_WINDOW {
            self.recent_game_durations_ms.pop_front();
        }
    }

    /// Mean of the recorded game durations, or a fixed default before any game in this
    /// room has completed.
    pub fn rolling_average_game_duration_ms(&self) -> u64 {
        if self.recent_game_durations_ms.is_empty() {
            return DEFAULT_ESTIMATED_GAME_DURATION_MS;
        }
        let sum: u64 = self.recent_game_durations_ms.iter().sum();
        sum / self.recent_game_durations_ms.len() as u64
    }

    /// Re-assigns `turn_order` across all seats to a gap-free `0..n-1` permutation,
    /// stable on the existing order (spec §4.6.3: "remove the seat, renumber turnOrder").
    /// Only meaningful before `playerOrder` is frozen at `game.start`.
    pub fn renumber_turn_orders(&mut self) {
        let mut ids: Vec<PlayerId> = self.seats.values().collect::<Vec<_>>().iter().map(|s| s.player_id).collect();
        ids.sort_by_key(|id| self.seats[id].turn_order);
        for (order, id) in ids.into_iter().enumerate() {
            if let Some(seat) = self.seats.get_mut(&id) {
                seat.turn_order = order as u8;
            }
        }
    }
}
