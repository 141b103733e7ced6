//! Application state: wires config, storage, the room registry, the lobby actor, auth
//! and metrics into something the connection gateway (`websocket`) can hand sockets to.
//!
//! Grounded in the teacher's `EnhancedGameServer` shape (one struct owning every shared
//! collaborator behind `Arc`, constructed once at startup and cloned into request
//! handlers) — generalised from the teacher's distributed-coordination wiring down to
//! this crate's in-process actor registry, since there is no multi-instance coordinator
//! left to wire (see `DESIGN.md`).

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::auth::AuthMiddleware;
use crate::config::Config;
use crate::lobby::{self, LobbyHandle};
use crate::metrics::ServerMetrics;
use crate::protocol::types::{PlayerId, RoomCode};
use crate::protocol::{generate_room_code, normalize_and_validate, ErrorCode};
use crate::rate_limit::{RateLimitConfig as RuntimeRateLimitConfig, RoomRateLimiter};
use crate::room::{self, PresenceUpdate, RoomHandle, RoomStatusUpdate};
use crate::storage::{InMemoryStorage, Storage};

/// Maximum attempts to find a free room code before giving up (spec §4.1 generator is
/// cryptographically random over a 31^6 space; collisions are a pathological case, not
/// an expected one).
const MAX_ROOM_CODE_ATTEMPTS: usize = 20;

/// Shared, cheaply-cloneable application state. One instance lives for the process
/// lifetime; every WebSocket connection handler holds a clone of its `Arc`.
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub auth: Arc<AuthMiddleware>,
    pub metrics: Arc<ServerMetrics>,
    pub rate_limiter: Arc<RoomRateLimiter>,
    rooms: Arc<DashMap<String, RoomHandle>>,
    pub lobby: LobbyHandle,
    directory_sink: mpsc::Sender<RoomStatusUpdate>,
    presence_sink: mpsc::Sender<PresenceUpdate>,
    room_closed_tx: mpsc::Sender<RoomCode>,
}

impl AppState {
    /// Builds the application state and spawns the singleton `GlobalLobby` actor plus the
    /// background task that evicts closed rooms from the registry. The lobby must be
    /// spawned exactly once, before any room, since every room is handed clones of its
    /// `directory_sink`/`presence_sink`.
    pub fn new(config: Config) -> Arc<Self> {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let metrics = Arc::new(ServerMetrics::new());
        let auth = Arc::new(if config.security.require_websocket_auth {
            AuthMiddleware::new(config.security.jwt.clone())
        } else {
            AuthMiddleware::disabled()
        });
        let rate_limiter = Arc::new(RoomRateLimiter::new(RuntimeRateLimitConfig {
            max_room_creations: config.rate_limit.max_room_creations,
            time_window: tokio::time::Duration::from_secs(config.rate_limit.time_window),
            max_join_attempts: config.rate_limit.max_join_attempts,
        }));
        rate_limiter.clone().start_cleanup_task();

        let (lobby, directory_sink, presence_sink) = lobby::spawn(
            config.lobby.clone(),
            config.protocol.clone(),
            storage.clone(),
            metrics.clone(),
        );

        let rooms: Arc<DashMap<String, RoomHandle>> = Arc::new(DashMap::new());
        let (room_closed_tx, mut room_closed_rx) = mpsc::channel::<RoomCode>(256);

        let cleanup_rooms = rooms.clone();
        tokio::spawn(async move {
            while let Some(code) = room_closed_rx.recv().await {
                if cleanup_rooms.remove(code.as_str()).is_some() {
                    info!(room_code = %code.as_str(), "room evicted from registry");
                }
            }
        });

        Arc::new(Self {
            config,
            storage,
            auth,
            metrics,
            rate_limiter,
            rooms,
            lobby,
            directory_sink,
            presence_sink,
            room_closed_tx,
        })
    }

    /// Creates a new room owned by `host_id`, retrying room-code generation on the rare
    /// collision with a live room. `max_players` is clamped to the configured ceiling.
    pub fn create_room(&self, host_id: PlayerId, max_players: u8, allow_spectators: bool) -> Result<RoomCode, ErrorCode> {
        let max_players = max_players
            .max(self.config.room.min_players)
            .min(self.config.room.max_players_ceiling);

        for _ in 0..MAX_ROOM_CODE_ATTEMPTS {
            let code = generate_room_code(&self.config.protocol);
            if self.rooms.contains_key(code.as_str()) {
                continue;
            }
            let handle = room::spawn(
                code.clone(),
                host_id,
                self.config.room.clone(),
                self.config.protocol.clone(),
                allow_spectators,
                max_players,
                self.storage.clone(),
                self.metrics.clone(),
                self.directory_sink.clone(),
                self.presence_sink.clone(),
                self.room_closed_tx.clone(),
            );
            match self.rooms.entry(code.as_str().to_string()) {
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(handle);
                }
            }
            ServerMetrics::inc(&self.metrics.rooms_created);
            return Ok(code);
        }

        warn!("exhausted room code attempts while creating a room");
        Err(ErrorCode::Internal)
    }

    /// Looks up a live room by its wire-level (possibly lower-case/untrimmed) code.
    pub fn room_code_from_raw(&self, raw: &str) -> Option<RoomCode> {
        normalize_and_validate(raw, &self.config.protocol)
    }

    pub fn get_room(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code.as_str()).map(|entry| entry.clone())
    }

    pub fn room_exists(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code.as_str())
    }
}
