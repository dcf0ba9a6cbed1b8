use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Element Clash Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::list_rooms,
        crate::routes::rooms::get_room,
        crate::routes::sse::public_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::RoomsResponse,
            crate::dto::room::RoomSummary,
            crate::dto::room::RoomSnapshot,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::sse::RoomCreatedEvent,
            crate::dto::sse::MatchStartedPublicEvent,
            crate::dto::sse::MatchEndedPublicEvent,
            crate::dto::sse::RoomClosedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Read-only room listings"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "game", description = "WebSocket protocol for game clients"),
    )
)]
/// OpenAPI document for the REST, SSE and WebSocket surface.
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/healthcheck", "/rooms", "/rooms/{id}", "/sse/public", "/ws"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
