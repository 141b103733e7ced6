//! Room and lobby behavior configuration types.

use super::defaults::{
    default_afk_warning_window_secs, default_allow_spectators, default_chat_log_capacity,
    default_directory_stale_threshold_secs, default_invite_ttl_secs,
    default_join_request_ttl_secs, default_lobby_debounce_ms, default_max_join_attempts,
    default_max_players, default_max_room_creations, default_min_players,
    default_pause_debounce_secs, default_rate_limit_time_window,
    default_reconnect_window_secs, default_room_cleanup_window_secs,
    default_turn_timeout_secs,
};
use serde::{Deserialize, Serialize};

/// Room lifecycle and timing configuration shared by every `GameRoom` actor.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoomConfig {
    /// Ceiling on `config.maxPlayers` a room may request (spec: `{2,3,4}`).
    #[serde(default = "default_max_players")]
    pub max_players_ceiling: u8,
    /// Minimum seated players required for `game.start`.
    #[serde(default = "default_min_players")]
    pub min_players: u8,
    /// Default per-turn timeout, seconds. `0` disables the timer (spec range `[0,300]`).
    #[serde(default = "default_turn_timeout_secs")]
    pub default_turn_timeout_secs: u32,
    /// Seconds before `TurnTimeout` fires that `player.afk_warning` is emitted.
    #[serde(default = "default_afk_warning_window_secs")]
    pub afk_warning_window_secs: u32,
    /// Seat reclaim window after a disconnect.
    #[serde(default = "default_reconnect_window_secs")]
    pub reconnect_window_secs: u64,
    /// Debounce delay before a disconnected current-turn player actually pauses the room.
    #[serde(default = "default_pause_debounce_secs")]
    pub pause_debounce_secs: u64,
    /// Coalescing delay for the debounced `room.status` push to the lobby.
    #[serde(default = "default_lobby_debounce_ms")]
    pub lobby_debounce_ms: u64,
    /// How long a completed/abandoned room lingers before `RoomCleanup` evicts it.
    #[serde(default = "default_room_cleanup_window_secs")]
    pub cleanup_window_secs: u64,
    /// Bounded ring size for room chat history (C4 ChatLog).
    #[serde(default = "default_chat_log_capacity")]
    pub chat_log_capacity: usize,
    /// Whether rooms accept spectators by default when `config.allowSpectators` is unset.
    #[serde(default = "default_allow_spectators")]
    pub allow_spectators_default: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players_ceiling: default_max_players(),
            min_players: default_min_players(),
            default_turn_timeout_secs: default_turn_timeout_secs(),
            afk_warning_window_secs: default_afk_warning_window_secs(),
            reconnect_window_secs: default_reconnect_window_secs(),
            pause_debounce_secs: default_pause_debounce_secs(),
            lobby_debounce_ms: default_lobby_debounce_ms(),
            cleanup_window_secs: default_room_cleanup_window_secs(),
            chat_log_capacity: default_chat_log_capacity(),
            allow_spectators_default: default_allow_spectators(),
        }
    }
}

/// `GlobalLobby` timing configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LobbyConfig {
    /// How long a `finished`/`closed` directory entry lingers before pruning (I6).
    #[serde(default = "default_directory_stale_threshold_secs")]
    pub directory_stale_threshold_secs: u64,
    /// Invite lifetime before the expiry alarm retires it.
    #[serde(default = "default_invite_ttl_secs")]
    pub invite_ttl_secs: u64,
    /// Join-request lifetime before the expiry alarm retires it.
    #[serde(default = "default_join_request_ttl_secs")]
    pub join_request_ttl_secs: u64,
    /// Bounded ring size for global chat history.
    #[serde(default = "default_chat_log_capacity")]
    pub chat_log_capacity: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            directory_stale_threshold_secs: default_directory_stale_threshold_secs(),
            invite_ttl_secs: default_invite_ttl_secs(),
            join_request_ttl_secs: default_join_request_ttl_secs(),
            chat_log_capacity: default_chat_log_capacity(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    /// Maximum number of room creation requests per time window
    #[serde(default = "default_max_room_creations")]
    pub max_room_creations: u32,
    /// Time window for rate limiting (seconds)
    #[serde(default = "default_rate_limit_time_window")]
    pub time_window: u64,
    /// Maximum number of join attempts per time window
    #[serde(default = "default_max_join_attempts")]
    pub max_join_attempts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_room_creations: default_max_room_creations(),
            time_window: default_rate_limit_time_window(),
            max_join_attempts: default_max_join_attempts(),
        }
    }
}
