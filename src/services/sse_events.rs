use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        room::RoomSummary,
        sse::{
            MatchEndedPublicEvent, MatchStartedPublicEvent, RoomClosedEvent, RoomCreatedEvent,
            ServerEvent,
        },
    },
    state::{SharedState, game::Team},
};

pub(crate) const EVENT_ROOM_CREATED: &str = "room.created";
pub(crate) const EVENT_MATCH_STARTED: &str = "match.started";
pub(crate) const EVENT_MATCH_ENDED: &str = "match.ended";
pub(crate) const EVENT_ROOM_CLOSED: &str = "room.closed";

/// Announce a new room on the lobby feed.
pub fn broadcast_room_created(state: &SharedState, room: RoomSummary) {
    send_public_event(state, EVENT_ROOM_CREATED, &RoomCreatedEvent { room });
}

/// Announce that a room left its lobby.
pub fn broadcast_match_started(state: &SharedState, room: &RoomSummary) {
    let payload = MatchStartedPublicEvent {
        room_id: room.id.clone(),
        mode: room.mode,
        humans: room.humans,
        bots: room.bots,
    };
    send_public_event(state, EVENT_MATCH_STARTED, &payload);
}

/// Announce the winner of a room.
pub fn broadcast_match_ended(state: &SharedState, room_id: &str, winner: Team) {
    let payload = MatchEndedPublicEvent {
        room_id: room_id.to_string(),
        winner,
    };
    send_public_event(state, EVENT_MATCH_ENDED, &payload);
}

/// Announce the teardown of an abandoned room.
pub fn broadcast_room_closed(state: &SharedState, room_id: &str) {
    let payload = RoomClosedEvent {
        room_id: room_id.to_string(),
    };
    send_public_event(state, EVENT_ROOM_CLOSED, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
