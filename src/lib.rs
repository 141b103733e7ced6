#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Dicee Server
//!
//! The authoritative game-state core for a multiplayer dice game: a `GameRoom` actor
//! per active match and a single `GlobalLobby` actor for presence, room discovery and
//! invites, both reachable over persistent WebSocket connections.
//!
//! In-process only — no external database, no multi-instance coordination. State lives
//! behind the [`storage::Storage`] trait so a durable backend can be swapped in without
//! touching actor logic.

/// JWT bearer-token verification.
pub mod auth;

/// Persisted, sorted multi-timer used by room and lobby actors for reconnection
/// windows, turn timeouts, AFK checks and invite/join-request expiry.
pub mod alarm_queue;

/// Bounded chat history buffer shared by room and lobby chat.
pub mod chat_log;

/// Layered JSON+env server configuration.
pub mod config;

/// Pure, deterministic dice-scoring engine.
pub mod engine;

/// GlobalLobby actor: presence, room directory, invites, join requests, global chat.
pub mod lobby;

/// Structured logging configuration.
pub mod logging;

/// Atomic-counter metrics and JSON snapshot.
pub mod metrics;

/// WebSocket wire protocol: client/server message envelopes, error codes, room codes.
pub mod protocol;

/// Sliding-window rate limiting for room creation and join attempts.
pub mod rate_limit;

/// GameRoom actor: seats, reconnection, turn FSM, AFK/pause, spectators, chat.
pub mod room;

/// Application state wiring config, storage, room registry, lobby handle, auth and
/// metrics into the axum router.
pub mod server;

/// Namespaced key-value persistence trait and in-memory implementation.
pub mod storage;

/// WebSocket upgrade routing and per-connection send/receive loops.
pub mod websocket;
