//! Room lifecycle: lobby, playing, ended. Transitions are one-way.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::game::Team;

/// Lifecycle phases of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// Roster is forming; nothing is simulated.
    Lobby,
    /// Words and element uses are accepted.
    Playing,
    /// Terminal; the room stays readable until it empties.
    Ended,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// Manual or matchmaking-driven start.
    StartMatch,
    /// A team's hp reached zero; `winner` is the other side.
    TeamDefeated {
        /// Team that dealt the finishing blow.
        winner: Team,
    },
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: RoomPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoomEvent,
}

/// Phase bookkeeping for a single room: lobby → playing → ended.
#[derive(Debug, Clone)]
pub struct RoomStateMachine {
    phase: RoomPhase,
    winner: Option<Team>,
}

impl Default for RoomStateMachine {
    fn default() -> Self {
        Self {
            phase: RoomPhase::Lobby,
            winner: None,
        }
    }
}

impl RoomStateMachine {
    /// Create a new state machine initialised in the lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Winning team, set exactly when the room ends.
    pub fn winner(&self) -> Option<Team> {
        self.winner
    }

    /// Apply `event`, returning the new phase.
    pub fn apply(&mut self, event: RoomEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        if let RoomEvent::TeamDefeated { winner } = event {
            self.winner = Some(winner);
        }
        self.phase = next;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: RoomEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (RoomPhase::Lobby, RoomEvent::StartMatch) => RoomPhase::Playing,
            (RoomPhase::Playing, RoomEvent::TeamDefeated { .. }) => RoomPhase::Ended,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
