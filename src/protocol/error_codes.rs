//! Structured error taxonomy for the `error` server event (spec §7).

use serde::{Deserialize, Serialize};

/// Wire-visible error code. Semantic categories per spec §7: Validation, Authorisation,
/// Capacity, Expiry/stale, Storage, Internal. Auth/token failures never reach this enum —
/// they're rejected at the WebSocket upgrade (HTTP 401) before any `error` event could be
/// emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Frame `type` did not match any known command (spec §4.1).
    UnknownType,
    /// Frame parsed as a known type but its payload failed structural validation.
    InvalidPayload,
    /// Command targets a player who is not the current turn-holder.
    NotYourTurn,
    /// Command is structurally valid but not permitted in the current state
    /// (wrong role, not host, game over, category already scored, bad keep mask, ...).
    InvalidAction,
    /// Room is at `maxPlayers` and spectators are disallowed or also full.
    RoomFull,
    /// `config.allowSpectators` is false and no seat is available.
    SpectatorsDisallowed,
    /// Target room code does not resolve to a live room.
    RoomNotFound,
    /// Operation targets an invite/join-request/turn that has already expired.
    Expired,
    /// A storage write failed; the mutation was aborted (storage-first discipline).
    Internal,
    /// Caller exceeded the room-creation or join-attempt sliding-window rate limit.
    RateLimited,
}

impl ErrorCode {
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownType => "unrecognised message type",
            Self::InvalidPayload => "message payload failed validation",
            Self::NotYourTurn => "it is not your turn",
            Self::InvalidAction => "action is not permitted in the current state",
            Self::RoomFull => "room is full",
            Self::SpectatorsDisallowed => "this room does not allow spectators",
            Self::RoomNotFound => "room not found",
            Self::Expired => "this operation has expired",
            Self::Internal => "internal server error",
            Self::RateLimited => "too many attempts, try again shortly",
        }
    }
}

/// Payload of the `error` server event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.description().to_string(),
            code,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// WebSocket close codes used at the upgrade boundary (spec §6).
pub mod close_codes {
    pub const NORMAL: u16 = 1000;
    pub const BAD_TOKEN: u16 = 4001;
    pub const ROOM_FULL: u16 = 4003;
    pub const ROOM_NOT_FOUND: u16 = 4004;
}
