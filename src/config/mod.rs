//! Configuration module for the dicee server.
//!
//! This module provides comprehensive configuration management with support for:
//! - JSON configuration files
//! - Environment variable overrides
//! - Stdin input
//! - Sensible defaults
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Room/lobby behavior configuration (timeouts, capacities)
//! - [`protocol`]: Room-code/player-name/chat validation limits
//! - [`security`]: Security and JWT verification settings
//! - [`logging`]: Logging configuration
//! - [`metrics`]: Metrics configuration
//! - [`websocket`]: WebSocket connection settings
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

// Submodules
pub mod defaults;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod protocol;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;
pub mod websocket;

// Re-exports for convenience
pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use metrics::MetricsConfig;

pub use protocol::{PlayerNameValidationConfig, ProtocolConfig};

pub use security::{ClientAuthMode, JwtConfig, SecurityConfig, TlsServerConfig};

pub use server::{LobbyConfig, RateLimitConfig, RoomConfig};

pub use types::Config;

pub use validation::{is_production_mode, validate_config_security};

pub use websocket::WebSocketConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 3536);
        assert_eq!(config.room.max_players_ceiling, 4);
        assert_eq!(config.room.min_players, 2);
        assert_eq!(config.room.reconnect_window_secs, 300);
        assert_eq!(config.lobby.directory_stale_threshold_secs, 60);
        assert_eq!(config.lobby.invite_ttl_secs, 60);

        assert_eq!(config.rate_limit.max_room_creations, 5);
        assert_eq!(config.rate_limit.time_window, 60);

        assert_eq!(config.protocol.room_code_length, 6);
        assert_eq!(config.protocol.max_player_name_length, 32);
        assert_eq!(config.protocol.max_chat_message_length, 500);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "server.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(
            config.room.max_players_ceiling,
            deserialized.room.max_players_ceiling
        );
        assert_eq!(
            config.rate_limit.max_room_creations,
            deserialized.rate_limit.max_room_creations
        );
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }
}
