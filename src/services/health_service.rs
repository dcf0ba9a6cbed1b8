use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the number of rooms and queued connections.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let queued = state.matchmaking().lock().await.total();
    HealthResponse::ok(state.rooms().len(), queued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, game::MatchMode, matchmaking::QueueEntry},
    };

    #[tokio::test]
    async fn reports_rooms_and_queue_length() {
        let state = AppState::new(AppConfig::default());
        state
            .matchmaking()
            .lock()
            .await
            .enqueue(MatchMode::Solo, QueueEntry::new("c1", "ana"))
            .unwrap();

        let health = health_status(&state).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.rooms, 0);
        assert_eq!(health.queued, 1);
    }
}
