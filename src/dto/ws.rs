//! WebSocket wire messages: inbound requests and outbound events.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        room::{PlayerCharges, PlayerFinalStats, PlayerSummary, TeamSnapshot},
        validation::{validate_nickname, validate_word},
    },
    state::{
        element::Advantage,
        game::{Element, ElementAction, ElementCharges, MatchMode, Role, Team, WordWithElement},
        state_machine::RoomPhase,
    },
};

/// Messages accepted from game WebSocket clients.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter the matchmaking queue of a mode.
    JoinQueue(JoinQueueRequest),
    /// Join a named room directly.
    JoinRoom(JoinRoomRequest),
    /// Start a lobby match now.
    StartMatch(RoomRequest),
    /// Toggle readiness in the lobby.
    PlayerReady(RoomRequest),
    /// Submit a typed word.
    WordTyped(WordTypedRequest),
    /// Spend a full element charge.
    UseElement(UseElementRequest),
    /// Leave the room voluntarily.
    LeaveMatch(RoomRequest),
}

/// Why an inbound frame was rejected before reaching a room.
#[derive(Debug, Error)]
pub enum InboundError {
    /// Not valid JSON or not a known event.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Well-formed but failed payload validation.
    #[error("invalid payload: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ClientMessage {
    /// Parse a text frame and validate its payload.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message: Self = serde_json::from_str(text)?;
        message.validate()?;
        Ok(message)
    }

    /// Room the message addresses, if any.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::JoinQueue(_) => None,
            Self::JoinRoom(req) => Some(&req.room_id),
            Self::StartMatch(req) | Self::PlayerReady(req) | Self::LeaveMatch(req) => {
                Some(&req.room_id)
            }
            Self::WordTyped(req) => Some(&req.room_id),
            Self::UseElement(req) => Some(&req.room_id),
        }
    }

    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinQueue(_) => "join_queue",
            Self::JoinRoom(_) => "join_room",
            Self::StartMatch(_) => "start_match",
            Self::PlayerReady(_) => "player_ready",
            Self::WordTyped(_) => "word_typed",
            Self::UseElement(_) => "use_element",
            Self::LeaveMatch(_) => "leave_match",
        }
    }
}

impl Validate for ClientMessage {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::JoinQueue(req) => req.validate(),
            Self::JoinRoom(req) => req.validate(),
            Self::StartMatch(req) | Self::PlayerReady(req) | Self::LeaveMatch(req) => {
                req.validate()
            }
            Self::WordTyped(req) => req.validate(),
            Self::UseElement(req) => req.validate(),
        }
    }
}

/// Payload of `join_queue`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinQueueRequest {
    /// Display name, trimmed before use.
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,
    /// Defaults to team play when omitted.
    #[serde(default)]
    pub mode: MatchMode,
}

/// Payload of `join_room`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    /// Display name, trimmed before use.
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,
    /// Room to join; created on first use.
    #[validate(length(min = 1, max = 64))]
    pub room_id: String,
}

/// Payload of the room-addressed events without extra fields.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    /// Addressed room.
    #[validate(length(min = 1, max = 64))]
    pub room_id: String,
}

/// Payload of `word_typed`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WordTypedRequest {
    /// Addressed room.
    #[validate(length(min = 1, max = 64))]
    pub room_id: String,
    /// Word as typed; matched case-insensitively after trimming.
    #[validate(length(min = 1, max = 64), custom(function = "validate_word"))]
    pub word: String,
}

/// Payload of `use_element`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UseElementRequest {
    /// Addressed room.
    #[validate(length(min = 1, max = 64))]
    pub room_id: String,
    /// Charge to spend.
    pub element: Element,
    /// Attack the enemy or raise a barrier.
    pub action: ElementAction,
}

/// Messages pushed to game WebSocket clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Seat assigned to the recipient.
    Matched(MatchedEvent),
    /// Recipient is waiting in a queue.
    Queued(QueuedEvent),
    /// Roster changed.
    RoomUpdate(RoomUpdateEvent),
    /// Match left the lobby.
    MatchStarted(MatchStartedEvent),
    /// Fresh deck for the recipient.
    NewWords(NewWordsEvent),
    /// Word not in the recipient's deck.
    WordInvalid(WordInvalidEvent),
    /// Element use below full charge.
    NotEnoughCharge(NotEnoughChargeEvent),
    /// Word accepted.
    WordCorrect(WordCorrectEvent),
    /// Chip boost from a normal word.
    SmallBoost(SmallBoostEvent),
    /// Attack resolved.
    AttackLanded(AttackLandedEvent),
    /// Barrier raised.
    BarrierCreated(BarrierCreatedEvent),
    /// Everyone's charges.
    ElementChargesUpdate(ElementChargesEvent),
    /// Final result and stats.
    MatchEnded(MatchEndedEvent),
    /// Recipient joined a full room as spectator.
    JoinedAsSpectator(SpectatorEvent),
    /// Recipient left the room.
    LeftRoom(LeftRoomEvent),
    /// Request rejected.
    Error(ErrorEvent),
}

impl ServerMessage {
    /// Build an `error` notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorEvent {
            message: message.into(),
        })
    }

    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Matched(_) => "matched",
            Self::Queued(_) => "queued",
            Self::RoomUpdate(_) => "room_update",
            Self::MatchStarted(_) => "match_started",
            Self::NewWords(_) => "new_words",
            Self::WordInvalid(_) => "word_invalid",
            Self::NotEnoughCharge(_) => "not_enough_charge",
            Self::WordCorrect(_) => "word_correct",
            Self::SmallBoost(_) => "small_boost",
            Self::AttackLanded(_) => "attack_landed",
            Self::BarrierCreated(_) => "barrier_created",
            Self::ElementChargesUpdate(_) => "element_charges_update",
            Self::MatchEnded(_) => "match_ended",
            Self::JoinedAsSpectator(_) => "joined_as_spectator",
            Self::LeftRoom(_) => "left_room",
            Self::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Private seat assignment.
pub struct MatchedEvent {
    /// Room the seat belongs to.
    pub room_id: String,
    /// Assigned side.
    pub team: Team,
    /// Assigned role within the side.
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Acknowledges a matchmaking request.
pub struct QueuedEvent {
    /// Queue joined.
    pub mode: MatchMode,
    /// 1-based position in the mode's queue.
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Roster snapshot broadcast on every roster change.
pub struct RoomUpdateEvent {
    /// Room identifier.
    pub room_id: String,
    /// Seated humans and bots.
    pub players: Vec<PlayerSummary>,
    /// Whether a start request would be accepted.
    pub can_start: bool,
    /// Current lifecycle phase.
    pub phase: RoomPhase,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Lobby to playing.
pub struct MatchStartedEvent {
    /// Always `playing`.
    pub phase: RoomPhase,
    /// Blue side at start.
    pub blue_team: TeamSnapshot,
    /// Red side at start.
    pub red_team: TeamSnapshot,
    /// Unix epoch milliseconds.
    pub match_start_time: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Fresh deck for the recipient.
pub struct NewWordsEvent {
    /// The full replacement deck.
    pub words: Vec<WordWithElement>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Submitted word was not in the current deck.
pub struct WordInvalidEvent {
    /// The rejected submission.
    pub word: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Element use attempted below full charge.
pub struct NotEnoughChargeEvent {
    /// Element requested.
    pub element: Element,
    /// Charge currently held.
    pub charge: u8,
    /// Charge needed to act.
    pub required: u8,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Accepted submission.
pub struct WordCorrectEvent {
    /// Deck word that matched.
    pub word: String,
    /// Element it charged.
    pub element: Element,
    /// Whether it was a charge word.
    pub is_charge: bool,
    /// Recipient's charges afterwards.
    pub charges: ElementCharges,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Chip boost granted by a normal word.
pub struct SmallBoostEvent {
    /// Player who typed the word.
    pub player_id: String,
    /// Side that was boosted.
    pub team: Team,
    /// Hp actually gained.
    pub hp_gain: u8,
    /// Shield actually gained.
    pub shield_gain: u8,
    /// Blue side afterwards.
    pub blue_team: TeamSnapshot,
    /// Red side afterwards.
    pub red_team: TeamSnapshot,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Resolved attack.
pub struct AttackLandedEvent {
    /// Player or bot that attacked.
    pub attacker_id: String,
    /// Attacking side.
    pub attacker_team: Team,
    /// Attack element.
    pub element: Element,
    /// Matchup against the defending barrier.
    pub advantage: Advantage,
    /// Shorthand for a critical matchup.
    pub is_critical: bool,
    /// Damage before absorption.
    pub damage: u16,
    /// Portion soaked by the barrier.
    pub absorbed: u16,
    /// Hp the defenders actually lost.
    pub hp_damage: u16,
    /// Whether the barrier was used up.
    pub barrier_broken: bool,
    /// Blue side afterwards.
    pub blue_team: TeamSnapshot,
    /// Red side afterwards.
    pub red_team: TeamSnapshot,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Barrier raised or replaced.
pub struct BarrierCreatedEvent {
    /// Player or bot that raised it.
    pub player_id: String,
    /// Protected side.
    pub team: Team,
    /// Barrier element.
    pub element: Element,
    /// Starting strength.
    pub strength: u8,
    /// Blue side afterwards.
    pub blue_team: TeamSnapshot,
    /// Red side afterwards.
    pub red_team: TeamSnapshot,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Every participant's charges.
pub struct ElementChargesEvent {
    /// One entry per seated participant.
    pub player_charges: Vec<PlayerCharges>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Terminal summary.
pub struct MatchEndedEvent {
    /// Side that won.
    pub winner: Team,
    /// Blue side at the end.
    pub blue_team: TeamSnapshot,
    /// Red side at the end.
    pub red_team: TeamSnapshot,
    /// One entry per roster member, bots included.
    pub stats: Vec<PlayerFinalStats>,
    /// Match length in milliseconds.
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Read-only bootstrap for a spectator.
pub struct SpectatorEvent {
    /// Room being watched.
    pub room_id: String,
    /// Seated humans and bots.
    pub players: Vec<PlayerSummary>,
    /// Blue side now.
    pub blue_team: TeamSnapshot,
    /// Red side now.
    pub red_team: TeamSnapshot,
    /// Current lifecycle phase.
    pub phase: RoomPhase,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Confirms a voluntary exit.
pub struct LeftRoomEvent {
    /// Room that was left.
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Negative acknowledgement for a rejected request.
pub struct ErrorEvent {
    /// Human-readable reason.
    pub message: String,
}
