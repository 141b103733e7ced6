//! Tagged-union command/event envelopes (spec §4.1, §6).
//!
//! `ClientMessage`/`ServerMessage` are the wire-level discriminated unions: every variant
//! shares a `type` tag and carries its payload under `payload`, matching the teacher's
//! `protocol::messages` shape (`#[serde(tag = "type", content = "payload")]`). Unknown
//! `type` values fail to deserialize into `ClientMessage`; the connection layer turns that
//! failure into an `ErrorCode::UnknownType` event rather than closing the socket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::Category;

use super::error_codes::ErrorPayload;
use super::types::{ChatMessageId, ConnectionRole, InviteId, PlayerId, RequestId, RoomCode};

/// Client → server commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Creates a new room and returns its code (spec §4.1 "room codes" generator); sent
    /// over the lobby connection, ahead of attaching to `/ws/room/{code}`. Handled by the
    /// connection layer directly (it needs the room registry, which the lobby actor does
    /// not own) rather than dispatched into `LobbyActor`.
    #[serde(rename = "room.create")]
    RoomCreate {
        max_players: u8,
        allow_spectators: bool,
    },

    /// Explicit intentional leave (distinct from a socket drop, which runs the
    /// disconnect/seat-reclaim path instead).
    #[serde(rename = "room.leave")]
    RoomLeave,

    #[serde(rename = "game.start")]
    GameStart,
    #[serde(rename = "game.rematch")]
    GameRematch,

    #[serde(rename = "dice.roll")]
    DiceRoll { kept: [bool; 5] },
    #[serde(rename = "dice.keep")]
    DiceKeep { indices: Vec<u8> },
    #[serde(rename = "category.score")]
    CategoryScore { category: Category },

    #[serde(rename = "chat")]
    Chat { content: String },
    #[serde(rename = "quick_chat")]
    QuickChat { phrase_id: String },
    #[serde(rename = "reaction")]
    Reaction { emoji: String },
    #[serde(rename = "typing_start")]
    TypingStart,
    #[serde(rename = "typing_stop")]
    TypingStop,

    #[serde(rename = "invite")]
    Invite {
        invitee_id: PlayerId,
        room_code: RoomCode,
    },
    #[serde(rename = "invite_response")]
    InviteResponse { invite_id: InviteId, accept: bool },
    #[serde(rename = "request_join")]
    RequestJoin { room_code: RoomCode },
    #[serde(rename = "cancel_join_request")]
    CancelJoinRequest { request_id: RequestId },
    #[serde(rename = "approve_join_request")]
    ApproveJoinRequest { request_id: RequestId },
    #[serde(rename = "decline_join_request")]
    DeclineJoinRequest { request_id: RequestId },

    #[serde(rename = "spectator.predict")]
    SpectatorPredict {
        player_id: PlayerId,
        category: Category,
    },
    #[serde(rename = "spectator.root")]
    SpectatorRoot { player_id: PlayerId },
    #[serde(rename = "spectator.kibitz_vote")]
    SpectatorKibitzVote { vote: String },
    #[serde(rename = "spectator.queue_join")]
    SpectatorQueueJoin,
    #[serde(rename = "spectator.queue_leave")]
    SpectatorQueueLeave,
}

/// Server → client events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename = "room.created")]
    RoomCreated { code: RoomCode },

    #[serde(rename = "room.state")]
    RoomState(Box<RoomStatePayload>),

    #[serde(rename = "player.joined")]
    PlayerJoined(PlayerJoinedPayload),
    #[serde(rename = "player.left")]
    PlayerLeft(PlayerLeftPayload),
    #[serde(rename = "player.connection")]
    PlayerConnection(PlayerConnectionPayload),
    #[serde(rename = "player.removed")]
    PlayerRemoved(PlayerRemovedPayload),
    #[serde(rename = "player.forfeited")]
    PlayerForfeited(PlayerForfeitedPayload),
    #[serde(rename = "player.afk_warning")]
    PlayerAfkWarning { seconds_remaining: u32 },

    #[serde(rename = "game.starting")]
    GameStarting,
    #[serde(rename = "game.started")]
    GameStarted(GameStartedPayload),
    #[serde(rename = "game.completed")]
    GameCompleted(Box<GameCompletedPayload>),

    #[serde(rename = "turn.started")]
    TurnStarted(TurnStartedPayload),
    #[serde(rename = "turn.ended")]
    TurnEnded(TurnEndedPayload),
    #[serde(rename = "turn.skipped")]
    TurnSkipped(TurnSkippedPayload),
    #[serde(rename = "dice.rolled")]
    DiceRolled(DiceRolledPayload),
    #[serde(rename = "dice.kept")]
    DiceKept(DiceKeptPayload),
    #[serde(rename = "category.scored")]
    CategoryScored(CategoryScoredPayload),

    #[serde(rename = "chat")]
    Chat(ChatPayload),
    #[serde(rename = "reaction")]
    Reaction { player_id: PlayerId, emoji: String },

    #[serde(rename = "spectator.joined")]
    SpectatorJoined(SpectatorJoinedPayload),
    #[serde(rename = "spectator.prediction")]
    SpectatorPrediction(SpectatorPredictionPayload),
    #[serde(rename = "spectator.rooting")]
    SpectatorRooting(SpectatorRootingPayload),
    #[serde(rename = "spectator.kibitz_vote")]
    SpectatorKibitzVote(SpectatorKibitzVotePayload),
    #[serde(rename = "spectator.queue_update")]
    SpectatorQueueUpdate(SpectatorQueueUpdatePayload),

    #[serde(rename = "room_update")]
    RoomUpdate(RoomUpdatePayload),
    #[serde(rename = "rooms")]
    Rooms(RoomsSnapshotPayload),
    #[serde(rename = "presence")]
    Presence(PresencePayload),
    #[serde(rename = "online_users")]
    OnlineUsers(OnlineUsersPayload),

    #[serde(rename = "invite_received")]
    InviteReceived(InviteReceivedPayload),
    #[serde(rename = "join_request_sent")]
    JoinRequestSent { request_id: RequestId, expires_at: DateTime<Utc> },
    #[serde(rename = "join_request_received")]
    JoinRequestReceived(JoinRequestReceivedPayload),
    #[serde(rename = "join_request_resolved")]
    JoinRequestResolved(JoinRequestResolvedPayload),

    #[serde(rename = "error")]
    Error(ErrorPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub display_name: String,
    pub avatar_seed: String,
    pub turn_order: u8,
    pub is_host: bool,
    pub connected: bool,
    pub total_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPayload {
    pub id: ChatMessageId,
    pub player_id: Option<PlayerId>,
    pub display_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub kind: ChatKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    User,
    System,
    Quick,
}

/// Full reconciliation snapshot sent on every attach (spec §4.6.1 step 4, §9
/// "hibernation-safe broadcasts" — the canonical reconciliation mechanism).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomStatePayload {
    pub code: RoomCode,
    pub state: String,
    pub host_id: PlayerId,
    pub your_player_id: PlayerId,
    pub your_role: ConnectionRole,
    pub max_players: u8,
    pub allow_spectators: bool,
    pub players: Vec<PlayerSummary>,
    pub spectator_count: usize,
    pub current_player_id: Option<PlayerId>,
    pub turn_number: u32,
    pub round_number: u32,
    pub current_dice: Option<[u8; 5]>,
    pub kept: Option<[bool; 5]>,
    pub rolls_remaining: u8,
    pub chat_history: Vec<ChatPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerJoinedPayload {
    pub player: PlayerSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLeftPayload {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConnectionPayload {
    pub player_id: PlayerId,
    pub is_connected: bool,
    pub reconnect_deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRemovedPayload {
    pub player_id: PlayerId,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerForfeitedPayload {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStartedPayload {
    pub player_order: Vec<PlayerId>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEntry {
    pub player_id: PlayerId,
    pub total_score: i32,
    pub dicee_bonus_count: u32,
    pub rank: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameCompletedPayload {
    pub rankings: Vec<RankingEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnStartedPayload {
    pub player_id: PlayerId,
    pub turn_number: u32,
    pub round_number: u32,
    pub turn_timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEndedPayload {
    pub player_id: PlayerId,
    pub category: Category,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSkippedPayload {
    pub player_id: PlayerId,
    pub reason: SkipReason,
    pub category_scored: Category,
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceRolledPayload {
    pub player_id: PlayerId,
    pub dice: [u8; 5],
    pub rolls_remaining: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceKeptPayload {
    pub player_id: PlayerId,
    pub kept: [bool; 5],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScoredPayload {
    pub player_id: PlayerId,
    pub category: Category,
    pub score: i32,
    pub dicee_bonus_awarded: bool,
    pub total_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectatorJoinedPayload {
    pub player_id: PlayerId,
    pub display_name: String,
}

/// Sent to a queued spectator whenever the warm-seat transition (spec §4.6.8) shifts
/// queue positions: after a promotion, every player still waiting gets their new
/// `position` (1-based, front of queue) and a refreshed `estimated_wait_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectatorQueueUpdatePayload {
    pub player_id: PlayerId,
    pub position: u32,
    pub estimated_wait_ms: u64,
}

/// Broadcast of a spectator's non-binding guess at which category a player will score
/// next (spec §4.1 "spectator actions (prediction, rooting, kibitz vote, ...)"). Purely
/// social: it does not touch `Scorecard` or turn state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectatorPredictionPayload {
    pub spectator_id: PlayerId,
    pub player_id: PlayerId,
    pub category: Category,
}

/// Broadcast of a spectator cheering on a seated player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectatorRootingPayload {
    pub spectator_id: PlayerId,
    pub player_id: PlayerId,
}

/// Broadcast of a spectator's free-text vote in the kibitzing channel (e.g. "should they
/// keep the fives?"). Tallying, if any, is left to clients; the room only relays votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectatorKibitzVotePayload {
    pub spectator_id: PlayerId,
    pub vote: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomUpdateAction {
    Updated,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDirectoryEntryView {
    pub code: RoomCode,
    pub status: String,
    pub player_count: u8,
    pub spectator_count: usize,
    pub host_id: PlayerId,
    pub is_public: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUpdatePayload {
    pub action: RoomUpdateAction,
    pub room: RoomDirectoryEntryView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsSnapshotPayload {
    pub rooms: Vec<RoomDirectoryEntryView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresencePayload {
    pub online_count: usize,
    pub in_room_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUserView {
    pub player_id: PlayerId,
    pub display_name: String,
    pub in_room: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUsersPayload {
    pub users: Vec<OnlineUserView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteReceivedPayload {
    pub invite_id: InviteId,
    pub room_code: RoomCode,
    pub inviter_id: PlayerId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequestReceivedPayload {
    pub request_id: RequestId,
    pub requester_id: PlayerId,
    pub room_code: RoomCode,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestOutcome {
    Approved,
    Declined,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequestResolvedPayload {
    pub request_id: RequestId,
    pub outcome: JoinRequestOutcome,
}
