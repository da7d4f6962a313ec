use crate::model::*;

use super::EngineError;

/// Rooms in insertion order. Iteration order is the allocator's tie-break
/// order and the adjacency graph's position space.
#[derive(Debug, Clone, Default)]
pub struct RoomStore {
    rooms: Vec<Room>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn as_slice(&self) -> &[Room] {
        &self.rooms
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    pub fn position(&self, key: &RoomKey) -> Option<usize> {
        self.rooms.iter().position(|r| r.is(key))
    }

    pub fn get(&self, key: &RoomKey) -> Option<&Room> {
        self.rooms.iter().find(|r| r.is(key))
    }

    pub fn contains(&self, key: &RoomKey) -> bool {
        self.get(key).is_some()
    }

    /// Append a room. `(room_id, building)` must be new.
    pub fn insert(&mut self, room: Room) -> Result<(), EngineError> {
        if self.rooms.iter().any(|r| r.room_id == room.room_id && r.building == room.building) {
            return Err(EngineError::DuplicateRoom(room.key()));
        }
        self.rooms.push(room);
        Ok(())
    }

    /// Remove a room, preserving the order of the rest.
    pub fn remove(&mut self, key: &RoomKey) -> Option<Room> {
        let pos = self.position(key)?;
        Some(self.rooms.remove(pos))
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str, building: &str) -> Room {
        Room::new(id, building, 30, Some(1), Facilities::default())
    }

    #[test]
    fn identity_is_scoped_to_building() {
        let mut store = RoomStore::new();
        store.insert(room("101", "Main")).unwrap();
        store.insert(room("101", "Science")).unwrap();
        assert_eq!(store.len(), 2);

        let err = store.insert(room("101", "Main")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateRoom(ref k) if *k == RoomKey::new("101", "Main")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_preserves_order() {
        let mut store = RoomStore::new();
        for id in ["a", "b", "c"] {
            store.insert(room(id, "Main")).unwrap();
        }
        let removed = store.remove(&RoomKey::new("b", "Main")).unwrap();
        assert_eq!(removed.room_id, "b");
        let ids: Vec<_> = store.iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(store.position(&RoomKey::new("c", "Main")), Some(1));
    }

    #[test]
    fn remove_missing_returns_none() {
        let mut store = RoomStore::new();
        store.insert(room("a", "Main")).unwrap();
        assert!(store.remove(&RoomKey::new("a", "Arts")).is_none());
        assert_eq!(store.len(), 1);
    }
}
