//! Read-only projections of live rooms for REST clients.

use crate::{
    dto::room::{RoomSnapshot, RoomsResponse},
    error::ServiceError,
    state::SharedState,
};

/// List every live room, sorted by id.
pub async fn list_rooms(state: &SharedState) -> RoomsResponse {
    let mut rooms = Vec::new();
    for handle in state.rooms().handles() {
        let room = handle.lock().await;
        if !room.is_closed() {
            rooms.push(room.summary());
        }
    }
    rooms.sort_by(|a, b| a.id.cmp(&b.id));
    RoomsResponse { rooms }
}

/// Return the full view of one room.
pub async fn get_room(state: &SharedState, room_id: &str) -> Result<RoomSnapshot, ServiceError> {
    let handle = state
        .rooms()
        .get(room_id)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}` not found")))?;
    let room = handle.lock().await;
    if room.is_closed() {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    }
    Ok(room.snapshot())
}

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::AppConfig,
        services::room_service,
        state::{AppState, ClientConnection, state_machine::RoomPhase},
    };

    fn connect(state: &SharedState, id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .connections()
            .insert(id.to_string(), ClientConnection::new(id.to_string(), tx));
        rx
    }

    #[tokio::test]
    async fn lists_and_describes_live_rooms() {
        let state = AppState::new(AppConfig::default());
        let _a = connect(&state, "c1");
        let _b = connect(&state, "c2");
        room_service::join_room(&state, "c1", "ana", "zeta").await.unwrap();
        room_service::join_room(&state, "c2", "ben", "alpha").await.unwrap();

        let listing = list_rooms(&state).await;
        let ids: Vec<_> = listing.rooms.iter().map(|room| room.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        assert_eq!(listing.rooms[0].humans, 1);
        assert_eq!(listing.rooms[0].bots, 3);

        let snapshot = get_room(&state, "alpha").await.unwrap();
        assert_eq!(snapshot.phase, RoomPhase::Lobby);
        assert_eq!(snapshot.players.len(), 4);
        assert_eq!(snapshot.blue_team.hp, 100);
        assert!(snapshot.started_at.is_none());
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let state = AppState::new(AppConfig::default());
        let err = get_room(&state, "nowhere").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
