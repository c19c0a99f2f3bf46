use crate::room::code::random_code;
use crate::room::Room;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const MAX_CODE_ATTEMPTS: usize = 100;

/// All live rooms, keyed by join code. The directory lock is never held
/// while a room lock is taken; reverse lookup snapshots the room list
/// first and inspects each room after releasing it.
pub struct Directory {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a room under a fresh code, retrying a bounded number of
    /// times on a code collision. The code space dwarfs the live-room
    /// count, so the bound is unreachable short of a full directory.
    pub fn create_room(&self) -> Arc<Room> {
        let mut rooms = self.rooms.write().unwrap();
        let mut code = random_code();
        let mut attempts = 1;
        while rooms.contains_key(&code) && attempts < MAX_CODE_ATTEMPTS {
            code = random_code();
            attempts += 1;
        }
        let room = Room::new(code.clone());
        rooms.insert(code, room.clone());
        room
    }

    pub fn get(&self, code: &str) -> Option<Arc<Room>> {
        self.rooms.read().unwrap().get(code).cloned()
    }

    pub fn remove(&self, code: &str) -> Option<Arc<Room>> {
        self.rooms.write().unwrap().remove(code)
    }

    /// Finds the room a participant belongs to, if any.
    pub fn find_by_player(&self, player_id: &str) -> Option<Arc<Room>> {
        let rooms: Vec<Arc<Room>> = self.rooms.read().unwrap().values().cloned().collect();
        rooms
            .into_iter()
            .find(|room| room.contains_player(player_id))
    }
}

#[allow(dead_code)]
impl Directory {
    pub fn len(&self) -> usize {
        self.rooms.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.read().unwrap().is_empty()
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}
