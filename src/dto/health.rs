use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok" while the server answers.
    pub status: String,
    /// Live rooms.
    pub rooms: usize,
    /// Connections waiting in any matchmaking queue.
    pub queued: usize,
}

impl HealthResponse {
    /// Create a health response with the current load figures.
    pub fn ok(rooms: usize, queued: usize) -> Self {
        Self {
            status: "ok".to_string(),
            rooms,
            queued,
        }
    }
}
