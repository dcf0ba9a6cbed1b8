use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{
    game::{Barrier, ElementCharges, MatchMode, Player, Role, Team, TeamState},
    state_machine::RoomPhase,
    stats::FinalStats,
};

/// Public projection of a team's health, chip shield and barrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TeamSnapshot {
    /// Remaining health.
    pub hp: u8,
    /// Cosmetic chip shield.
    pub shield: u8,
    /// Active elemental barrier.
    pub barrier: Option<Barrier>,
}

impl From<&TeamState> for TeamSnapshot {
    fn from(value: &TeamState) -> Self {
        Self {
            hp: value.hp,
            shield: value.shield,
            barrier: value.barrier,
        }
    }
}

/// Roster entry exposed to room members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    /// Connection id or bot id.
    pub id: String,
    /// Display name.
    pub nickname: String,
    /// Side of the seat.
    pub team: Team,
    /// Role of the seat.
    pub role: Role,
    /// Whether a bot holds the seat.
    pub is_bot: bool,
}

impl From<&Player> for PlayerSummary {
    fn from(value: &Player) -> Self {
        Self {
            id: value.id.clone(),
            nickname: value.nickname.clone(),
            team: value.team,
            role: value.role,
            is_bot: value.is_bot(),
        }
    }
}

/// Charge levels of one participant, visible to the whole room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlayerCharges {
    /// Participant id.
    pub id: String,
    /// Per-element gauges.
    pub charges: ElementCharges,
    /// Mean of the three gauges.
    pub average: u8,
}

impl From<&Player> for PlayerCharges {
    fn from(value: &Player) -> Self {
        Self {
            id: value.id.clone(),
            charges: value.charges,
            average: value.charges.average(),
        }
    }
}

/// End-of-match line for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerFinalStats {
    /// Participant id.
    pub id: String,
    /// Display name.
    pub nickname: String,
    /// Side played.
    pub team: Team,
    /// Role played.
    pub role: Role,
    /// Whether a bot held the seat.
    pub is_bot: bool,
    /// Words per minute.
    pub wpm: u32,
    /// Accuracy percentage.
    pub accuracy: u32,
    /// Damage before barrier absorption.
    pub damage_dealt: u32,
    /// Shield and barrier strength granted.
    pub shield_restored: u32,
}

impl From<FinalStats> for PlayerFinalStats {
    fn from(value: FinalStats) -> Self {
        Self {
            id: value.id,
            nickname: value.nickname,
            team: value.team,
            role: value.role,
            is_bot: value.is_bot,
            wpm: value.wpm,
            accuracy: value.accuracy,
            damage_dealt: value.damage_dealt,
            shield_restored: value.shield_restored,
        }
    }
}

/// One line of the `/rooms` listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSummary {
    /// Room identifier.
    pub id: String,
    /// Room size.
    pub mode: MatchMode,
    /// Lifecycle phase.
    pub phase: RoomPhase,
    /// Seated humans.
    pub humans: usize,
    /// Seated bots.
    pub bots: usize,
    /// Watching connections.
    pub spectators: usize,
}

/// Full read-only view of a room.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Room identifier.
    pub id: String,
    /// Room size.
    pub mode: MatchMode,
    /// Lifecycle phase.
    pub phase: RoomPhase,
    /// Seated humans and bots.
    pub players: Vec<PlayerSummary>,
    /// Blue side.
    pub blue_team: TeamSnapshot,
    /// Red side.
    pub red_team: TeamSnapshot,
    /// Winning team once ended.
    pub winner: Option<Team>,
    /// RFC 3339 timestamp of the match start.
    pub started_at: Option<String>,
}

/// Response payload of `GET /rooms`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomsResponse {
    /// Live rooms in no particular order.
    pub rooms: Vec<RoomSummary>,
}
