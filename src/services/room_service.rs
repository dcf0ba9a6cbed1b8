//! Room operations requested by connected clients.
//!
//! Every operation locks the room, applies the change, and delivers the resulting outbox before
//! releasing the lock.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    dto::ws::{LeftRoomEvent, ServerMessage},
    error::ServiceError,
    services::{bot_service, sse_events},
    state::{
        SharedState,
        game::{Element, ElementAction},
        registry::RoomHandle,
        room::{LeaveOutcome, Room},
        state_machine::RoomPhase,
    },
};

const JOIN_ATTEMPTS: usize = 3;

/// Seat `connection_id` in `room_id`, creating the room if needed.
///
/// A connection already in another room leaves it first. Full rooms evict a bot or fall back
/// to spectating. A queued connection is withdrawn, unless a batch already claimed it.
pub async fn join_room(
    state: &SharedState,
    connection_id: &str,
    nickname: &str,
    room_id: &str,
) -> Result<(), ServiceError> {
    {
        let mut queue = state.matchmaking().lock().await;
        queue.remove(connection_id);
        if state.is_matching(connection_id) {
            return Err(ServiceError::InvalidState(
                "already being placed in a match".into(),
            ));
        }
    }
    if let Some(current) = state
        .current_room(connection_id)
        .filter(|current| current != room_id)
    {
        leave_room(state, connection_id, &current).await;
    }

    let config = state.config();
    let mode = config.rules().direct_join_mode;
    for _ in 0..JOIN_ATTEMPTS {
        let (handle, created) = state.rooms().get_or_create(room_id, || {
            Room::new(room_id.to_string(), mode, Arc::clone(&config))
        });
        let mut room = handle.lock().await;
        if room.is_closed() {
            drop(room);
            state.rooms().remove(&handle);
            continue;
        }

        let (_, outbox) = room.join(connection_id, nickname, Instant::now());
        if !state.set_current_room(connection_id, Some(room_id.to_string())) {
            // Connection vanished while we were seating it.
            let (outcome, _) = room.leave(connection_id);
            if outcome == LeaveOutcome::Abandoned {
                drop(room);
                teardown(state, &handle);
            }
            return Ok(());
        }
        state.deliver(&room, outbox);
        let summary = room.summary();
        drop(room);

        if created {
            bot_service::spawn_bot_driver(state.clone(), &handle);
            sse_events::broadcast_room_created(state, summary);
        }
        handle.wake_bots();
        return Ok(());
    }

    Err(ServiceError::InvalidState(format!(
        "room `{room_id}` is closing, try again"
    )))
}

/// Manual lobby to playing transition by a seated human.
pub async fn start_match(
    state: &SharedState,
    connection_id: &str,
    room_id: &str,
) -> Result<(), ServiceError> {
    let handle = member_room(state, connection_id, room_id)?;
    let mut room = handle.lock().await;
    let outbox = room.start(Some(connection_id), Instant::now())?;
    state.deliver(&room, outbox);
    let summary = room.summary();
    drop(room);

    handle.wake_bots();
    sse_events::broadcast_match_started(state, &summary);
    Ok(())
}

/// Start a matchmade room unless it already started or was torn down.
pub async fn auto_start(state: &SharedState, handle: &Arc<RoomHandle>) {
    let mut room = handle.lock().await;
    if room.is_closed() || room.phase() != RoomPhase::Lobby {
        return;
    }
    match room.start(None, Instant::now()) {
        Ok(outbox) => {
            state.deliver(&room, outbox);
            let summary = room.summary();
            drop(room);
            handle.wake_bots();
            sse_events::broadcast_match_started(state, &summary);
        }
        Err(err) => warn!(room_id = handle.id(), error = %err, "auto start failed"),
    }
}

/// Deal a fresh deck to the requesting player.
pub async fn player_ready(
    state: &SharedState,
    connection_id: &str,
    room_id: &str,
) -> Result<(), ServiceError> {
    let handle = member_room(state, connection_id, room_id)?;
    let mut room = handle.lock().await;
    let outbox = room.player_ready(connection_id);
    state.deliver(&room, outbox);
    Ok(())
}

/// Submit a typed word.
pub async fn submit_word(
    state: &SharedState,
    connection_id: &str,
    room_id: &str,
    word: &str,
) -> Result<(), ServiceError> {
    let handle = member_room(state, connection_id, room_id)?;
    let mut room = handle.lock().await;
    let outbox = room.submit_word(connection_id, word);
    state.deliver(&room, outbox);
    Ok(())
}

/// Spend a full charge.
pub async fn use_element(
    state: &SharedState,
    connection_id: &str,
    room_id: &str,
    element: Element,
    action: ElementAction,
) -> Result<(), ServiceError> {
    let handle = member_room(state, connection_id, room_id)?;
    let mut room = handle.lock().await;
    let before = room.phase();
    let outbox = room.use_element(connection_id, element, action, Instant::now());
    state.deliver(&room, outbox);
    let winner = room.winner().filter(|_| before == RoomPhase::Playing);
    drop(room);

    if let Some(winner) = winner {
        handle.wake_bots();
        sse_events::broadcast_match_ended(state, room_id, winner);
    }
    Ok(())
}

/// Voluntary exit.
pub async fn leave_match(
    state: &SharedState,
    connection_id: &str,
    room_id: &str,
) -> Result<(), ServiceError> {
    member_room(state, connection_id, room_id)?;
    leave_room(state, connection_id, room_id).await;
    state.send_to(
        connection_id,
        &ServerMessage::LeftRoom(LeftRoomEvent {
            room_id: room_id.to_string(),
        }),
    );
    Ok(())
}

/// Clean up after a closed socket: withdraw from matchmaking and leave any room.
pub async fn disconnect(state: &SharedState, connection_id: &str) {
    state.matchmaking().lock().await.remove(connection_id);
    let room_id = state
        .connections()
        .remove(connection_id)
        .and_then(|(_, connection)| connection.room_id);
    if let Some(room_id) = room_id {
        leave_room(state, connection_id, &room_id).await;
    }
}

/// Remove `connection_id` from `room_id`, tearing the room down once abandoned.
pub(crate) async fn leave_room(state: &SharedState, connection_id: &str, room_id: &str) {
    if state.current_room(connection_id).as_deref() == Some(room_id) {
        state.set_current_room(connection_id, None);
    }
    let Some(handle) = state.rooms().get(room_id) else {
        return;
    };
    let mut room = handle.lock().await;
    let (outcome, outbox) = room.leave(connection_id);
    state.deliver(&room, outbox);
    drop(room);

    if outcome == LeaveOutcome::Abandoned {
        teardown(state, &handle);
    }
}

/// Drop an abandoned room and stop its background tasks.
fn teardown(state: &SharedState, handle: &Arc<RoomHandle>) {
    handle.abort_tasks();
    if state.rooms().remove(handle) {
        info!(room_id = handle.id(), "room closed");
        sse_events::broadcast_room_closed(state, handle.id());
    }
}

/// Resolve the room a room-addressed message targets, checking membership.
fn member_room(
    state: &SharedState,
    connection_id: &str,
    room_id: &str,
) -> Result<Arc<RoomHandle>, ServiceError> {
    if state.current_room(connection_id).as_deref() != Some(room_id) {
        return Err(ServiceError::InvalidInput(format!(
            "not a member of room `{room_id}`"
        )));
    }
    state
        .rooms()
        .get(room_id)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}` not found")))
}

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, ClientConnection},
    };

    fn connect(state: &SharedState, id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .connections()
            .insert(id.to_string(), ClientConnection::new(id.to_string(), tx));
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            names.push(value["event"].as_str().unwrap().to_string());
        }
        names
    }

    #[tokio::test]
    async fn direct_join_creates_room_with_bots() {
        let state = AppState::new(AppConfig::default());
        let mut rx = connect(&state, "c1");
        let mut lobby = state.public_sse().subscribe();

        join_room(&state, "c1", "ana", "arena").await.unwrap();

        assert_eq!(drain(&mut rx), vec!["matched", "room_update"]);
        let handle = state.rooms().get("arena").unwrap();
        let room = handle.lock().await;
        assert_eq!(room.human_count(), 1);
        assert_eq!(room.bot_count(), 3);
        drop(room);
        assert_eq!(
            lobby.recv().await.unwrap().event.as_deref(),
            Some(sse_events::EVENT_ROOM_CREATED)
        );
    }

    #[tokio::test]
    async fn messages_for_other_rooms_are_rejected() {
        let state = AppState::new(AppConfig::default());
        let _rx = connect(&state, "c1");
        join_room(&state, "c1", "ana", "arena").await.unwrap();

        let err = submit_word(&state, "c1", "elsewhere", "flame").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn start_and_play_through_the_service() {
        let state = AppState::new(AppConfig::default());
        let mut rx = connect(&state, "c1");
        join_room(&state, "c1", "ana", "arena").await.unwrap();
        drain(&mut rx);

        start_match(&state, "c1", "arena").await.unwrap();
        assert_eq!(
            drain(&mut rx),
            vec!["match_started", "new_words", "element_charges_update"]
        );

        submit_word(&state, "c1", "arena", "definitely-not-dealt").await.unwrap();
        assert_eq!(drain(&mut rx), vec!["word_invalid"]);

        use_element(&state, "c1", "arena", Element::Fire, ElementAction::Attack)
            .await
            .unwrap();
        assert_eq!(drain(&mut rx), vec!["not_enough_charge"]);

        let err = start_match(&state, "c1", "arena").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn rejoining_elsewhere_leaves_the_old_room() {
        let state = AppState::new(AppConfig::default());
        let _rx = connect(&state, "c1");
        join_room(&state, "c1", "ana", "first").await.unwrap();
        join_room(&state, "c1", "ana", "second").await.unwrap();

        assert!(state.rooms().get("first").is_none());
        assert_eq!(state.current_room("c1").as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn last_disconnect_tears_the_room_down() {
        let state = AppState::new(AppConfig::default());
        let mut ana = connect(&state, "c1");
        let _ben = connect(&state, "c2");
        join_room(&state, "c1", "ana", "arena").await.unwrap();
        join_room(&state, "c2", "ben", "arena").await.unwrap();
        drain(&mut ana);

        leave_match(&state, "c2", "arena").await.unwrap();
        assert_eq!(drain(&mut ana), vec!["room_update"]);
        assert_eq!(state.current_room("c2"), None);

        disconnect(&state, "c1").await;
        assert!(state.rooms().is_empty());
        assert!(state.connections().get("c1").is_none());
    }
}
