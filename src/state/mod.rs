//! Shared application state: live rooms, open connections and matchmaking queues.

/// Bot cadence and decisions.
pub mod bot;
/// Elemental matchups.
pub mod element;
/// Elements, teams, charges and participants.
pub mod game;
/// Per-mode matchmaking queues.
pub mod matchmaking;
/// Live room registry.
pub mod registry;
/// Single battle room.
pub mod room;
mod sse;
/// Room lifecycle phases.
pub mod state_machine;
/// End-of-match statistics.
pub mod stats;
/// Word decks.
pub mod words;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::{
    config::AppConfig,
    dto::ws::ServerMessage,
    services::websocket_service::{encode_message, send_message_to_websocket},
    state::{
        matchmaking::MatchmakingQueue,
        registry::RoomRegistry,
        room::{Dispatch, Outbox, Room},
    },
};

pub use self::sse::SseHub;

/// Application state shared by every handler and background task.
pub type SharedState = Arc<AppState>;

const PUBLIC_SSE_CAPACITY: usize = 64;

#[derive(Clone)]
/// Handle used to push messages to a connected game client.
pub struct ClientConnection {
    /// Connection identifier assigned on upgrade.
    pub id: String,
    /// Outbound channel drained by the socket writer task.
    pub tx: mpsc::UnboundedSender<Message>,
    /// Room the connection is seated in or spectating.
    pub room_id: Option<String>,
    /// Set while a matchmaking batch holding this connection is being seated.
    pub matching: bool,
}

impl ClientConnection {
    /// Fresh connection that is not in any room.
    pub fn new(id: String, tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id,
            tx,
            room_id: None,
            matching: false,
        }
    }
}

/// Central application state: configuration, live rooms, connections and queues.
pub struct AppState {
    config: Arc<AppConfig>,
    rooms: RoomRegistry,
    connections: DashMap<String, ClientConnection>,
    matchmaking: Mutex<MatchmakingQueue>,
    public_sse: SseHub,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            rooms: RoomRegistry::default(),
            connections: DashMap::new(),
            matchmaking: Mutex::new(MatchmakingQueue::new()),
            public_sse: SseHub::new(PUBLIC_SSE_CAPACITY),
        })
    }

    /// Shared immutable configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// Registry of live rooms.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Registry of open game sockets keyed by connection id.
    pub fn connections(&self) -> &DashMap<String, ClientConnection> {
        &self.connections
    }

    /// Matchmaking queues.
    pub fn matchmaking(&self) -> &Mutex<MatchmakingQueue> {
        &self.matchmaking
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }

    /// Room `connection_id` currently belongs to.
    pub fn current_room(&self, connection_id: &str) -> Option<String> {
        self.connections
            .get(connection_id)
            .and_then(|connection| connection.room_id.clone())
    }

    /// Record the room of `connection_id`. Returns false if the connection is gone.
    ///
    /// Settles any pending matchmaking claim.
    pub fn set_current_room(&self, connection_id: &str, room_id: Option<String>) -> bool {
        match self.connections.get_mut(connection_id) {
            Some(mut connection) => {
                connection.room_id = room_id;
                connection.matching = false;
                true
            }
            None => false,
        }
    }

    /// Mark `connection_id` as taken by a matchmaking batch.
    ///
    /// Callers hold the matchmaking lock. Returns false if the connection is gone or already
    /// sits in a room.
    pub fn claim_for_batch(&self, connection_id: &str) -> bool {
        match self.connections.get_mut(connection_id) {
            Some(mut connection) if connection.room_id.is_none() => {
                connection.matching = true;
                true
            }
            _ => false,
        }
    }

    /// Whether a matchmaking batch is currently seating `connection_id`.
    pub fn is_matching(&self, connection_id: &str) -> bool {
        self.connections
            .get(connection_id)
            .is_some_and(|connection| connection.matching)
    }

    /// Push one message to a single connection. Returns false if it could not be queued.
    pub fn send_to(&self, connection_id: &str, message: &ServerMessage) -> bool {
        let Some(tx) = self.sender(connection_id) else {
            debug!(
                connection_id,
                event = message.name(),
                "dropping message for unknown connection"
            );
            return false;
        };
        send_message_to_websocket(&tx, message).is_ok()
    }

    /// Deliver a room outbox in order. Broadcasts go to the room's current recipients.
    pub fn deliver(&self, room: &Room, outbox: Outbox) {
        if outbox.is_empty() {
            return;
        }
        let recipients = room.recipients();
        for dispatch in outbox {
            match dispatch {
                Dispatch::Room(message) => {
                    let Some(frame) = encode_message(&message) else {
                        continue;
                    };
                    for connection_id in &recipients {
                        if let Some(tx) = self.sender(connection_id) {
                            let _ = tx.send(frame.clone());
                        }
                    }
                }
                Dispatch::Direct { to, message } => {
                    self.send_to(&to, &message);
                }
            }
        }
    }

    fn sender(&self, connection_id: &str) -> Option<mpsc::UnboundedSender<Message>> {
        self.connections
            .get(connection_id)
            .map(|connection| connection.tx.clone())
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::state::game::MatchMode;

    fn connect(state: &SharedState, id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .connections()
            .insert(id.to_string(), ClientConnection::new(id.to_string(), tx));
        rx
    }

    fn events(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            names.push(value["event"].as_str().unwrap().to_string());
        }
        names
    }

    #[test]
    fn deliver_routes_broadcasts_and_unicasts() {
        let state = AppState::new(AppConfig::default());
        let mut ana = connect(&state, "c1");
        let mut ben = connect(&state, "c2");

        let mut room = Room::new("r1".into(), MatchMode::Solo, state.config());
        let now = Instant::now();
        let (_, outbox) = room.join("c1", "ana", now);
        state.deliver(&room, outbox);
        let (_, outbox) = room.join("c2", "ben", now);
        state.deliver(&room, outbox);

        assert_eq!(events(&mut ana), vec!["matched", "room_update", "room_update"]);
        assert_eq!(events(&mut ben), vec!["matched", "room_update"]);
    }

    #[test]
    fn room_membership_follows_the_connection() {
        let state = AppState::new(AppConfig::default());
        let _rx = connect(&state, "c1");
        assert!(state.set_current_room("c1", Some("r1".into())));
        assert_eq!(state.current_room("c1").as_deref(), Some("r1"));
        assert!(!state.set_current_room("ghost", Some("r1".into())));
        assert!(!state.send_to("ghost", &ServerMessage::error("x")));
    }

    #[test]
    fn batch_claims_settle_when_a_room_is_recorded() {
        let state = AppState::new(AppConfig::default());
        let _ana = connect(&state, "c1");
        let _ben = connect(&state, "c2");
        state.set_current_room("c2", Some("r1".into()));

        assert!(state.claim_for_batch("c1"));
        assert!(state.is_matching("c1"));
        assert!(!state.claim_for_batch("c2"));
        assert!(!state.claim_for_batch("ghost"));

        state.set_current_room("c1", Some("r2".into()));
        assert!(!state.is_matching("c1"));
        assert_eq!(state.current_room("c1").as_deref(), Some("r2"));
    }
}
