//! Library crate for element-clash-back, exposing modules for binaries and integration tests.

/// Gameplay tuning and word vocabularies.
pub mod config;
mod dto;
mod error;
/// HTTP, SSE and WebSocket routes.
pub mod routes;
/// Operations behind the routes and background tasks.
pub mod services;
/// Shared state, rooms and game rules.
pub mod state;
