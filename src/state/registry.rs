//! Live rooms keyed by id.

use std::sync::{Arc, Mutex as StdMutex};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::{
    sync::{Mutex, MutexGuard, Notify},
    task::AbortHandle,
};

use crate::state::room::Room;

/// Shared handle to one room and the background tasks serving it.
pub struct RoomHandle {
    id: String,
    room: Mutex<Room>,
    bots_changed: Notify,
    tasks: StdMutex<Vec<AbortHandle>>,
}

impl RoomHandle {
    /// Wrap `room` in a shareable handle.
    pub fn new(room: Room) -> Arc<Self> {
        Arc::new(Self {
            id: room.id().to_string(),
            room: Mutex::new(room),
            bots_changed: Notify::new(),
            tasks: StdMutex::new(Vec::new()),
        })
    }

    /// Id of the wrapped room.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Serialize access to the room. Outboxes must be delivered before the guard drops.
    pub async fn lock(&self) -> MutexGuard<'_, Room> {
        self.room.lock().await
    }

    /// Tell the bot driver that the schedule may have moved earlier.
    pub fn wake_bots(&self) {
        self.bots_changed.notify_one();
    }

    /// Resolves after the next [`RoomHandle::wake_bots`] (or immediately if one is pending).
    pub async fn bots_changed(&self) {
        self.bots_changed.notified().await;
    }

    /// Keep `task` so that teardown can abort it.
    pub fn track(&self, task: AbortHandle) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|task| !task.is_finished());
            tasks.push(task);
        }
    }

    /// Abort every tracked task.
    pub fn abort_tasks(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

/// Registry of every live room.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<RoomHandle>>,
}

impl RoomRegistry {
    /// Room registered under `id`.
    pub fn get(&self, id: &str) -> Option<Arc<RoomHandle>> {
        self.rooms.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Fetch `id`, creating it with `make` when absent. The flag is true for a new room.
    pub fn get_or_create(&self, id: &str, make: impl FnOnce() -> Room) -> (Arc<RoomHandle>, bool) {
        match self.rooms.entry(id.to_string()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let handle = RoomHandle::new(make());
                entry.insert(Arc::clone(&handle));
                (handle, true)
            }
        }
    }

    /// Register a freshly created room.
    pub fn insert(&self, handle: Arc<RoomHandle>) {
        self.rooms.insert(handle.id().to_string(), handle);
    }

    /// Drop `handle` from the registry unless the id was already reused by another room.
    pub fn remove(&self, handle: &Arc<RoomHandle>) -> bool {
        self.rooms
            .remove_if(handle.id(), |_, current| Arc::ptr_eq(current, handle))
            .is_some()
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Every registered room, in no particular order.
    pub fn handles(&self) -> Vec<Arc<RoomHandle>> {
        self.rooms
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, state::game::MatchMode};

    fn make(id: &str) -> Room {
        Room::new(id.into(), MatchMode::Solo, Arc::new(AppConfig::default()))
    }

    #[test]
    fn get_or_create_reuses_existing_rooms() {
        let registry = RoomRegistry::default();
        let (first, created) = registry.get_or_create("r1", || make("r1"));
        assert!(created);
        let (second, created) = registry.get_or_create("r1", || make("r1"));
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_ignores_stale_handles() {
        let registry = RoomRegistry::default();
        let (stale, _) = registry.get_or_create("r1", || make("r1"));
        assert!(registry.remove(&stale));

        let (fresh, created) = registry.get_or_create("r1", || make("r1"));
        assert!(created);
        assert!(!registry.remove(&stale));
        assert!(Arc::ptr_eq(&registry.get("r1").unwrap(), &fresh));
    }

    #[tokio::test]
    async fn abort_tasks_stops_tracked_work() {
        let handle = RoomHandle::new(make("r1"));
        let task = tokio::spawn(std::future::pending::<()>());
        handle.track(task.abort_handle());
        handle.abort_tasks();
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
