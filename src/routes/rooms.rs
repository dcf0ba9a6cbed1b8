use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::room::{RoomSnapshot, RoomsResponse},
    error::AppError,
    services::rooms_service,
    state::SharedState,
};

/// Read-only endpoints describing live rooms.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms/{id}", get(get_room))
}

#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    responses((status = 200, description = "Live rooms", body = RoomsResponse))
)]
/// List every live room.
pub async fn list_rooms(State(state): State<SharedState>) -> Json<RoomsResponse> {
    Json(rooms_service::list_rooms(&state).await)
}

#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "rooms",
    params(("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Room state", body = RoomSnapshot),
        (status = 404, description = "Unknown room")
    )
)]
/// Return the state of one room.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = rooms_service::get_room(&state, &id).await?;
    Ok(Json(snapshot))
}
