use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Health check payloads.
pub mod health;
/// Room projections shared by REST and socket events.
pub mod room;
/// Public SSE payloads.
pub mod sse;
/// Custom validators for inbound payloads.
pub mod validation;
/// Game socket messages.
pub mod ws;

pub(crate) fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
