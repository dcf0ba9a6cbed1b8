use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::room::RoomSummary,
    state::game::{MatchMode, Team},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE event name.
    pub event: Option<String>,
    /// Encoded data field.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already encoded data field.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a room is opened by a direct join or by matchmaking.
pub struct RoomCreatedEvent {
    /// The new room.
    pub room: RoomSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a room leaves its lobby.
pub struct MatchStartedPublicEvent {
    /// Room identifier.
    pub room_id: String,
    /// Room size.
    pub mode: MatchMode,
    /// Seated humans.
    pub humans: usize,
    /// Seated bots.
    pub bots: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a match is decided.
pub struct MatchEndedPublicEvent {
    /// Room identifier.
    pub room_id: String,
    /// Side that won.
    pub winner: Team,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when an abandoned room is torn down.
pub struct RoomClosedEvent {
    /// Room identifier.
    pub room_id: String,
}
