//! Matchmaking queues, one FIFO per match mode.
//!
//! Modes never mix: a batch only drains the queue of the mode whose timer fired.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::state::game::MatchMode;

/// A connection waiting for a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Connection to seat.
    pub connection_id: String,
    /// Trimmed display name.
    pub nickname: String,
}

impl QueueEntry {
    /// Entry for `connection_id` playing as `nickname`.
    pub fn new(connection_id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            nickname: nickname.into(),
        }
    }
}

/// Errors that can occur while enqueueing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The connection already waits in a queue.
    #[error("already queued for {mode:?} play")]
    AlreadyQueued {
        /// Queue the connection is in.
        mode: MatchMode,
    },
}

/// Result of a successful enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    /// 1-based position in the mode's queue.
    pub position: usize,
    /// True when this entry opened a new batch window and the caller must arm its timer.
    pub arm_timer: bool,
}

/// Waiting connections keyed by mode.
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    queues: HashMap<MatchMode, VecDeque<QueueEntry>>,
    armed: HashSet<MatchMode>,
}

impl MatchmakingQueue {
    /// Empty queues with no timer armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry` to the queue of `mode`.
    pub fn enqueue(&mut self, mode: MatchMode, entry: QueueEntry) -> Result<Enqueued, QueueError> {
        if let Some(mode) = self.mode_of(&entry.connection_id) {
            return Err(QueueError::AlreadyQueued { mode });
        }

        let queue = self.queues.entry(mode).or_default();
        queue.push_back(entry);
        let position = queue.len();
        let arm_timer = self.armed.insert(mode);

        Ok(Enqueued {
            position,
            arm_timer,
        })
    }

    /// Mode `connection_id` is waiting for, if any.
    pub fn mode_of(&self, connection_id: &str) -> Option<MatchMode> {
        self.queues.iter().find_map(|(mode, queue)| {
            queue
                .iter()
                .any(|entry| entry.connection_id == connection_id)
                .then_some(*mode)
        })
    }

    /// Withdraw `connection_id` from whichever queue holds it.
    pub fn remove(&mut self, connection_id: &str) -> Option<MatchMode> {
        for (mode, queue) in self.queues.iter_mut() {
            if let Some(index) = queue
                .iter()
                .position(|entry| entry.connection_id == connection_id)
            {
                queue.remove(index);
                return Some(*mode);
            }
        }
        None
    }

    /// Empty the queue of `mode` into room-sized batches, oldest first.
    ///
    /// The last batch may be short; the room it lands in is padded with bots. Draining also
    /// closes the batch window so the next enqueue arms a new timer.
    pub fn drain(&mut self, mode: MatchMode) -> Vec<Vec<QueueEntry>> {
        self.armed.remove(&mode);
        let Some(queue) = self.queues.get_mut(&mode) else {
            return Vec::new();
        };
        let entries: Vec<QueueEntry> = queue.drain(..).collect();
        entries
            .chunks(mode.capacity())
            .map(<[QueueEntry]>::to_vec)
            .collect()
    }

    /// Number of connections waiting for `mode`.
    pub fn len(&self, mode: MatchMode) -> usize {
        self.queues.get(&mode).map_or(0, VecDeque::len)
    }

    /// Number of connections waiting across every mode.
    pub fn total(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_rejects_duplicates_across_modes() {
        let mut queue = MatchmakingQueue::new();
        let first = queue
            .enqueue(MatchMode::Solo, QueueEntry::new("c1", "ana"))
            .unwrap();
        assert_eq!(
            first,
            Enqueued {
                position: 1,
                arm_timer: true
            }
        );

        let err = queue
            .enqueue(MatchMode::Team, QueueEntry::new("c1", "ana"))
            .unwrap_err();
        assert_eq!(
            err,
            QueueError::AlreadyQueued {
                mode: MatchMode::Solo
            }
        );
        assert_eq!(queue.total(), 1);
    }

    #[test]
    fn only_the_first_entry_of_a_window_arms_the_timer() {
        let mut queue = MatchmakingQueue::new();
        assert!(queue.enqueue(MatchMode::Team, QueueEntry::new("c1", "a")).unwrap().arm_timer);
        let second = queue.enqueue(MatchMode::Team, QueueEntry::new("c2", "b")).unwrap();
        assert_eq!(second.position, 2);
        assert!(!second.arm_timer);
        assert!(queue.enqueue(MatchMode::Solo, QueueEntry::new("c3", "c")).unwrap().arm_timer);

        queue.drain(MatchMode::Team);
        assert!(queue.enqueue(MatchMode::Team, QueueEntry::new("c4", "d")).unwrap().arm_timer);
    }

    #[test]
    fn drain_chunks_by_capacity_and_leaves_other_modes() {
        let mut queue = MatchmakingQueue::new();
        for id in ["c1", "c2", "c3", "c4", "c5"] {
            queue.enqueue(MatchMode::Solo, QueueEntry::new(id, id)).unwrap();
        }
        queue.enqueue(MatchMode::Team, QueueEntry::new("t1", "t1")).unwrap();

        let batches = queue.drain(MatchMode::Solo);
        let ids: Vec<Vec<&str>> = batches
            .iter()
            .map(|batch| batch.iter().map(|entry| entry.connection_id.as_str()).collect())
            .collect();
        assert_eq!(ids, vec![vec!["c1", "c2"], vec!["c3", "c4"], vec!["c5"]]);
        assert_eq!(queue.len(MatchMode::Solo), 0);
        assert_eq!(queue.len(MatchMode::Team), 1);
        assert!(queue.drain(MatchMode::Solo).is_empty());
    }

    #[test]
    fn remove_withdraws_a_waiting_connection() {
        let mut queue = MatchmakingQueue::new();
        queue.enqueue(MatchMode::Team, QueueEntry::new("c1", "a")).unwrap();
        queue.enqueue(MatchMode::Team, QueueEntry::new("c2", "b")).unwrap();

        assert_eq!(queue.remove("c1"), Some(MatchMode::Team));
        assert_eq!(queue.remove("c1"), None);
        assert_eq!(queue.mode_of("c2"), Some(MatchMode::Team));
        assert_eq!(queue.len(MatchMode::Team), 1);
    }
}
