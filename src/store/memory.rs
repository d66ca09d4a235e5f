//! Process-memory room store.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{Commit, RoomStore, StoreError};
use crate::room::{Room, RoomCode};

type Slot = Arc<Mutex<Option<Room>>>;

/// Rooms held in a map of per-code mutexes.
///
/// The outer lock only guards slot lookup and creation; a mutation holds the
/// slot mutex of its own room and nothing else.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: RwLock<HashMap<RoomCode, Slot>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        debug!("Creating in-memory room store");
        Self::default()
    }

    /// Number of rooms present.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self.rooms.read().values().cloned().collect();
        slots.iter().filter(|slot| slot.lock().is_some()).count()
    }

    /// True when no room has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn existing_slot(&self, code: &RoomCode) -> Option<Slot> {
        self.rooms.read().get(code).cloned()
    }

    fn slot(&self, code: &RoomCode) -> Slot {
        if let Some(slot) = self.existing_slot(code) {
            return slot;
        }
        self.rooms.write().entry(code.clone()).or_default().clone()
    }
}

impl RoomStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    #[instrument(skip(self), fields(room_code = %code))]
    fn load(&self, code: &RoomCode) -> Result<Option<Room>, StoreError> {
        Ok(self.existing_slot(code).and_then(|slot| slot.lock().clone()))
    }

    #[instrument(skip(self, room), fields(room_code = %room.code()))]
    fn save(&self, room: &Room) -> Result<(), StoreError> {
        *self.slot(room.code()).lock() = Some(room.clone());
        Ok(())
    }

    #[instrument(skip(self, transform), fields(room_code = %code))]
    fn read_modify_write(
        &self,
        code: &RoomCode,
        transform: &mut dyn FnMut(Option<Room>) -> Commit,
    ) -> Result<(), StoreError> {
        let slot = self.slot(code);
        let mut current = slot.lock();
        if let Commit::Write(next) = transform(current.clone()) {
            *current = Some(next);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::modify;
    use chrono::Utc;

    fn room(code: u16) -> Room {
        Room::new(
            RoomCode::from_number(code).unwrap(),
            "r".into(),
            "Ana".into(),
            Utc::now(),
        )
    }

    #[test]
    fn test_load_unknown_code() {
        let store = MemoryStore::new();
        let code = RoomCode::from_number(1234).unwrap();
        assert_eq!(store.load(&code).unwrap(), None);
    }

    #[test]
    fn test_keep_does_not_create_room() {
        let store = MemoryStore::new();
        let code = RoomCode::from_number(1234).unwrap();
        let seen = modify(&store, &code, |room| (Commit::Keep, room.is_some())).unwrap();
        assert!(!seen);
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_then_load() {
        let store = MemoryStore::new();
        let room = room(4321);
        modify(&store, room.code(), |_| (Commit::Write(room.clone()), ())).unwrap();
        assert_eq!(store.load(room.code()).unwrap(), Some(room));
        assert_eq!(store.len(), 1);
    }
}
