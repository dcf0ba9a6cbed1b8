/// Background driver running bot turns per room.
pub mod bot_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Matchmaking queues and batch formation.
pub mod matchmaking_service;
/// Room operations requested over the game socket.
pub mod room_service;
/// Read-only room projections for REST clients.
pub mod rooms_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
