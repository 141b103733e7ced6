//! Default value functions for configuration fields.
//!
//! This module contains all the default value functions used by serde's `#[serde(default = ...)]`
//! attributes throughout the configuration system. Functions are organized by category for
//! easier maintenance.

use super::logging::LogFormat;
use super::security::ClientAuthMode;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3536
}

// =============================================================================
// Room defaults
// =============================================================================

pub const fn default_max_players() -> u8 {
    4
}

pub const fn default_min_players() -> u8 {
    2
}

pub const fn default_turn_timeout_secs() -> u32 {
    60
}

pub const fn default_afk_warning_window_secs() -> u32 {
    10
}

pub const fn default_reconnect_window_secs() -> u64 {
    300 // 5 minutes, matches spec's ReconnectWindow
}

pub const fn default_pause_debounce_secs() -> u64 {
    2
}

pub const fn default_lobby_debounce_ms() -> u64 {
    300
}

pub const fn default_room_cleanup_window_secs() -> u64 {
    300 // linger after game.completed before the room is evicted
}

pub const fn default_chat_log_capacity() -> usize {
    100
}

pub const fn default_allow_spectators() -> bool {
    true
}

// =============================================================================
// Lobby defaults
// =============================================================================

pub const fn default_directory_stale_threshold_secs() -> u64 {
    60
}

pub const fn default_invite_ttl_secs() -> u64 {
    60
}

pub const fn default_join_request_ttl_secs() -> u64 {
    60
}

// =============================================================================
// Rate Limit Defaults
// =============================================================================

pub const fn default_max_room_creations() -> u32 {
    5
}

pub const fn default_rate_limit_time_window() -> u64 {
    60
}

pub const fn default_max_join_attempts() -> u32 {
    20
}

// =============================================================================
// Protocol Defaults
// =============================================================================

pub const fn default_room_code_length() -> usize {
    6
}

pub const fn default_max_player_name_length() -> usize {
    32
}

pub const fn default_max_chat_message_length() -> usize {
    500
}

// =============================================================================
// Player Name Validation Defaults
// =============================================================================

pub const fn default_allow_unicode_player_names() -> bool {
    true
}

pub const fn default_allow_spaces_in_player_names() -> bool {
    true
}

pub const fn default_allow_leading_trailing_whitespace() -> bool {
    false
}

pub fn default_allowed_player_name_symbols() -> Vec<char> {
    vec!['-', '_']
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    true
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "http://localhost:3000,http://localhost:5173".to_string()
}

pub const fn default_require_auth() -> bool {
    true // Enforce authentication by default; opt-out only for explicit development scenarios
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB
}

pub const fn default_max_connections_per_ip() -> usize {
    10
}

pub const fn default_client_auth_mode() -> ClientAuthMode {
    ClientAuthMode::None
}

pub const fn default_jwt_leeway_secs() -> u64 {
    30
}

// =============================================================================
// Metrics Defaults
// =============================================================================

pub const fn default_metrics_snapshot_interval_secs() -> u64 {
    15
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub const fn default_auth_timeout_secs() -> u64 {
    10 // time allowed for a client to complete the WS upgrade handshake auth
}

pub const fn default_outbound_queue_capacity() -> usize {
    64
}
