//! Per-room driver that runs bot ticks as they fall due.

use std::sync::Arc;

use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::{
    services::sse_events,
    state::{SharedState, registry::RoomHandle, state_machine::RoomPhase},
};

/// Spawn the bot driver of `handle` and register it for teardown.
pub fn spawn_bot_driver(state: SharedState, handle: &Arc<RoomHandle>) {
    let task = tokio::spawn(run_bot_driver(state, Arc::clone(handle)));
    handle.track(task.abort_handle());
}

/// Sleep until the earliest bot tick, run every due bot, repeat.
///
/// Any change to the schedule (match start, bot replacement, match end) wakes the driver so
/// it re-reads the next deadline. The loop ends once the room is closed.
async fn run_bot_driver(state: SharedState, handle: Arc<RoomHandle>) {
    debug!(room_id = handle.id(), "bot driver started");
    loop {
        let next_due = {
            let room = handle.lock().await;
            if room.is_closed() {
                break;
            }
            room.next_bot_due()
        };

        match next_due {
            Some(due) => {
                tokio::select! {
                    _ = sleep_until(due) => {}
                    _ = handle.bots_changed() => continue,
                }
            }
            None => {
                handle.bots_changed().await;
                continue;
            }
        }

        let mut room = handle.lock().await;
        if room.is_closed() {
            break;
        }
        let before = room.phase();
        let outbox = room.run_due_bots(Instant::now());
        state.deliver(&room, outbox);
        let winner = room.winner().filter(|_| before == RoomPhase::Playing);
        drop(room);

        if let Some(winner) = winner {
            info!(room_id = handle.id(), ?winner, "bots finished the match");
            sse_events::broadcast_match_ended(&state, handle.id(), winner);
        }
    }
    debug!(room_id = handle.id(), "bot driver stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::{AppConfig, GameRules},
        services::room_service,
        state::{
            AppState, ClientConnection,
            game::{MatchMode, Team},
            words::WordPools,
        },
    };

    #[tokio::test(start_paused = true)]
    async fn aggressive_bot_beats_an_idle_human() {
        let rules = GameRules {
            bot_action_chance: 1.0,
            bot_attack_weight: 1.0,
            direct_join_mode: MatchMode::Solo,
            ..GameRules::default()
        };
        let state = AppState::new(AppConfig::new(rules, WordPools::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        state
            .connections()
            .insert("c1".into(), ClientConnection::new("c1".into(), tx));

        room_service::join_room(&state, "c1", "ana", "arena").await.unwrap();
        room_service::start_match(&state, "c1", "arena").await.unwrap();

        // The red bot attacks at most every 5 s; blue falls after four hits.
        tokio::time::sleep(Duration::from_secs(30)).await;

        let handle = state.rooms().get("arena").unwrap();
        let room = handle.lock().await;
        assert_eq!(room.phase(), RoomPhase::Ended);
        assert_eq!(room.winner(), Some(Team::Red));
        assert_eq!(room.next_bot_due(), None);
        drop(room);

        let mut ended = 0;
        while let Ok(Message::Text(text)) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            if value["event"] == "match_ended" {
                ended += 1;
            }
        }
        assert_eq!(ended, 1);
    }
}
