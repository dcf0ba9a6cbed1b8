//! Queue handling and batch formation.

use std::sync::Arc;

use tokio::time::{Instant, sleep};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{QueuedEvent, ServerMessage},
    error::ServiceError,
    services::{bot_service, room_service, sse_events},
    state::{
        SharedState,
        game::MatchMode,
        matchmaking::QueueEntry,
        registry::RoomHandle,
        room::{JoinOutcome, Room},
    },
};

/// Put `connection_id` in the `mode` queue, leaving any current room first.
///
/// The first entry of a batch window arms the batch timer for that mode.
pub async fn join_queue(
    state: &SharedState,
    connection_id: &str,
    nickname: &str,
    mode: MatchMode,
) -> Result<(), ServiceError> {
    if let Some(current) = state.current_room(connection_id) {
        room_service::leave_room(state, connection_id, &current).await;
    }

    let enqueued = {
        let mut queue = state.matchmaking().lock().await;
        if state.is_matching(connection_id) {
            return Err(ServiceError::InvalidState(
                "already being placed in a match".into(),
            ));
        }
        queue.enqueue(mode, QueueEntry::new(connection_id, nickname.trim()))?
    };
    info!(connection_id, ?mode, position = enqueued.position, "queued for match");

    state.send_to(
        connection_id,
        &ServerMessage::Queued(QueuedEvent {
            mode,
            position: enqueued.position,
        }),
    );

    if enqueued.arm_timer {
        let state = state.clone();
        let delay = state.config().rules().matchmaking_batch_delay();
        tokio::spawn(async move {
            sleep(delay).await;
            form_batches(&state, mode).await;
        });
    }
    Ok(())
}

/// Drain the `mode` queue into new rooms and schedule their automatic start.
///
/// Returns the ids of the rooms created.
pub async fn form_batches(state: &SharedState, mode: MatchMode) -> Vec<String> {
    let batches = claim_batches(state, mode).await;
    let mut created = Vec::with_capacity(batches.len());

    for batch in batches {
        let room_id = Uuid::new_v4().to_string();
        let handle = RoomHandle::new(Room::new(room_id.clone(), mode, state.config()));
        state.rooms().insert(Arc::clone(&handle));

        let mut room = handle.lock().await;
        let entrants = batch
            .iter()
            .map(|entry| (entry.connection_id.as_str(), entry.nickname.as_str()));
        let (outcomes, outbox) = room.seat_batch(entrants, Instant::now());

        let mut vanished = Vec::new();
        for (connection_id, outcome) in &outcomes {
            if !matches!(outcome, JoinOutcome::Seated { .. }) {
                warn!(
                    connection_id = %connection_id,
                    room_id = %room_id,
                    "matchmade connection was not seated"
                );
            }
            if !state.set_current_room(connection_id, Some(room_id.clone())) {
                vanished.push(connection_id.clone());
            }
        }
        state.deliver(&room, outbox);
        for connection_id in &vanished {
            let (_, outbox) = room.leave(connection_id);
            state.deliver(&room, outbox);
        }
        let abandoned = room.is_closed();
        let summary = room.summary();
        drop(room);

        if abandoned {
            state.rooms().remove(&handle);
            continue;
        }

        info!(
            room_id = %room_id,
            ?mode,
            humans = summary.humans,
            bots = summary.bots,
            "matchmade room formed"
        );
        bot_service::spawn_bot_driver(state.clone(), &handle);
        sse_events::broadcast_room_created(state, summary);
        schedule_auto_start(state, &handle);
        created.push(room_id);
    }

    created
}

/// Drain the `mode` queue and claim every entry still connected and roomless.
///
/// Claiming happens under the matchmaking lock so a concurrent direct join either removes the
/// entry first or sees the claim and backs off.
async fn claim_batches(state: &SharedState, mode: MatchMode) -> Vec<Vec<QueueEntry>> {
    let mut queue = state.matchmaking().lock().await;
    queue
        .drain(mode)
        .into_iter()
        .map(|batch| {
            batch
                .into_iter()
                .filter(|entry| state.claim_for_batch(&entry.connection_id))
                .collect::<Vec<_>>()
        })
        .filter(|batch| !batch.is_empty())
        .collect()
}

fn schedule_auto_start(state: &SharedState, handle: &Arc<RoomHandle>) {
    let delay = state.config().rules().match_start_delay();
    let state = state.clone();
    let room = Arc::clone(handle);
    let task = tokio::spawn(async move {
        sleep(delay).await;
        room_service::auto_start(&state, &room).await;
    });
    handle.track(task.abort_handle());
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, ClientConnection, state_machine::RoomPhase},
    };

    fn connect(state: &SharedState, id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .connections()
            .insert(id.to_string(), ClientConnection::new(id.to_string(), tx));
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<serde_json::Value> {
        let mut values = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            values.push(serde_json::from_str(text.as_str()).unwrap());
        }
        values
    }

    fn names(values: &[serde_json::Value]) -> Vec<&str> {
        values
            .iter()
            .map(|value| value["event"].as_str().unwrap())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn lone_solo_player_gets_a_bot_and_a_started_match() {
        let state = AppState::new(AppConfig::default());
        let mut rx = connect(&state, "c1");

        join_queue(&state, "c1", "ana", MatchMode::Solo).await.unwrap();
        assert_eq!(names(&drain(&mut rx)), vec!["queued"]);

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        let events = drain(&mut rx);
        assert_eq!(names(&events), vec!["matched", "room_update"]);
        let room_id = events[0]["data"]["roomId"].as_str().unwrap().to_string();
        assert_eq!(events[1]["data"]["players"].as_array().unwrap().len(), 2);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(
            names(&drain(&mut rx)),
            vec!["match_started", "new_words", "element_charges_update"]
        );

        let handle = state.rooms().get(&room_id).unwrap();
        let room = handle.lock().await;
        assert_eq!(room.phase(), RoomPhase::Playing);
        assert_eq!(room.human_count(), 1);
        assert_eq!(room.bot_count(), 1);
    }

    #[tokio::test]
    async fn queues_are_batched_per_mode() {
        let state = AppState::new(AppConfig::default());
        let _rx: Vec<_> = ["s1", "s2", "s3", "t1"]
            .into_iter()
            .map(|id| connect(&state, id))
            .collect();
        for id in ["s1", "s2", "s3"] {
            join_queue(&state, id, id, MatchMode::Solo).await.unwrap();
        }
        join_queue(&state, "t1", "t1", MatchMode::Team).await.unwrap();

        let rooms = form_batches(&state, MatchMode::Solo).await;
        assert_eq!(rooms.len(), 2);
        assert_eq!(state.current_room("s1"), state.current_room("s2"));
        assert_ne!(state.current_room("s1"), state.current_room("s3"));
        assert_eq!(state.current_room("t1"), None);
        assert_eq!(state.matchmaking().lock().await.len(MatchMode::Team), 1);
    }

    #[tokio::test]
    async fn duplicate_queue_requests_are_rejected() {
        let state = AppState::new(AppConfig::default());
        let _rx = connect(&state, "c1");
        join_queue(&state, "c1", "ana", MatchMode::Team).await.unwrap();
        let err = join_queue(&state, "c1", "ana", MatchMode::Solo)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn disconnected_entries_do_not_keep_rooms_alive() {
        let state = AppState::new(AppConfig::default());
        let _rx = connect(&state, "c1");
        join_queue(&state, "c1", "ana", MatchMode::Solo).await.unwrap();
        state.connections().remove("c1");

        assert!(form_batches(&state, MatchMode::Solo).await.is_empty());
        assert!(state.rooms().is_empty());
    }

    async fn rooms_holding(state: &SharedState, connection_id: &str) -> Vec<String> {
        let mut holding = Vec::new();
        for handle in state.rooms().handles() {
            if handle.lock().await.player(connection_id).is_some() {
                holding.push(handle.id().to_string());
            }
        }
        holding
    }

    #[tokio::test]
    async fn claimed_entries_refuse_direct_joins_until_seated() {
        let state = AppState::new(AppConfig::default());
        let _ana = connect(&state, "c1");
        let _ben = connect(&state, "c2");
        join_queue(&state, "c1", "ana", MatchMode::Solo).await.unwrap();
        join_queue(&state, "c2", "ben", MatchMode::Solo).await.unwrap();

        let batches = claim_batches(&state, MatchMode::Solo).await;
        assert_eq!(batches.len(), 1);
        assert!(state.is_matching("c1"));

        let err = room_service::join_room(&state, "c1", "ana", "side")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        let err = join_queue(&state, "c1", "ana", MatchMode::Team)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert!(state.rooms().get("side").is_none());
        assert_eq!(state.matchmaking().lock().await.total(), 0);
    }

    #[tokio::test]
    async fn seated_connections_are_not_claimed_again() {
        let state = AppState::new(AppConfig::default());
        let _ana = connect(&state, "c1");
        let _ben = connect(&state, "c2");
        join_queue(&state, "c1", "ana", MatchMode::Solo).await.unwrap();
        join_queue(&state, "c2", "ben", MatchMode::Solo).await.unwrap();
        state.set_current_room("c2", Some("elsewhere".into()));

        let rooms = form_batches(&state, MatchMode::Solo).await;
        assert_eq!(rooms.len(), 1);
        assert_eq!(state.current_room("c1").as_deref(), Some(rooms[0].as_str()));
        assert_eq!(state.current_room("c2").as_deref(), Some("elsewhere"));
        assert!(rooms_holding(&state, "c2").await.is_empty());
        assert!(!state.is_matching("c1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn direct_join_racing_a_batch_seats_the_connection_once() {
        for round in 0..200 {
            let state = AppState::new(AppConfig::default());
            let ids: Vec<String> = (0..8).map(|n| format!("c{n}")).collect();
            let _rx: Vec<_> = ids.iter().map(|id| connect(&state, id)).collect();
            for id in &ids {
                join_queue(&state, id, id, MatchMode::Solo).await.unwrap();
            }

            let batch = tokio::spawn({
                let state = state.clone();
                async move { form_batches(&state, MatchMode::Solo).await }
            });
            let direct = tokio::spawn({
                let state = state.clone();
                let room_id = format!("x{round}");
                async move { room_service::join_room(&state, "c7", "c7", &room_id).await }
            });
            batch.await.unwrap();
            let _ = direct.await.unwrap();

            let holding = rooms_holding(&state, "c7").await;
            assert_eq!(holding.len(), 1, "round {round}: c7 in {holding:?}");
            assert_eq!(state.current_room("c7").as_ref(), holding.first());
            assert!(!state.is_matching("c7"));
        }
    }
}
