use crate::error::Result;
use crate::storage::{ClaimOutcome, RoomStore};
use crate::types::{NewRoom, Room, RoomId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-local [`RoomStore`], used by tests and single-process demos.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.read().is_empty()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn insert(&self, room: NewRoom) -> Result<RoomId> {
        let id = RoomId::new();
        self.rooms.write().insert(id, room.into_room(id));
        Ok(id)
    }

    async fn get(&self, id: RoomId) -> Result<Option<Room>> {
        Ok(self.rooms.read().get(&id).cloned())
    }

    async fn created_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Room>> {
        let mut rooms: Vec<Room> = self
            .rooms
            .read()
            .values()
            .filter(|room| room.created_at >= cutoff)
            .cloned()
            .collect();
        rooms.sort_by_key(|room| room.created_at);
        Ok(rooms)
    }

    async fn claim_player2(
        &self,
        id: RoomId,
        address: &str,
        username: &str,
    ) -> Result<ClaimOutcome> {
        // check and set under the same write guard
        let mut rooms = self.rooms.write();

        let Some(room) = rooms.get_mut(&id) else {
            return Ok(ClaimOutcome::NotFound);
        };

        if room.is_full() {
            return Ok(ClaimOutcome::AlreadyClaimed);
        }

        room.player2_address = address.to_string();
        room.player2_username = username.to_string();
        Ok(ClaimOutcome::Claimed(room.clone()))
    }

    async fn delete(&self, id: RoomId) -> Result<bool> {
        Ok(self.rooms.write().remove(&id).is_some())
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut rooms = self.rooms.write();
        let before = rooms.len();
        rooms.retain(|_, room| room.created_at >= cutoff);
        Ok(before - rooms.len())
    }
}
