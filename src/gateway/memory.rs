//! In-memory gateway implementations.
//!
//! Suitable for single-process deployments and tests. A DBMS-backed store
//! would implement the same traits behind a connection pool.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{DirectoryError, StoredMessage, StoreError};

use super::{MessageStore, RoomDirectory};

/// In-memory [`MessageStore`] keeping per-room message logs.
#[derive(Default)]
pub struct InMemoryMessageStore {
    rooms: Mutex<HashMap<String, Vec<StoredMessage>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, message: StoredMessage) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        rooms.entry(message.room.clone()).or_default().push(message);
        Ok(())
    }

    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<StoredMessage>, StoreError> {
        let rooms = self.rooms.lock().await;
        let log = match rooms.get(room) {
            Some(log) => log,
            None => return Ok(Vec::new()),
        };
        let start = log.len().saturating_sub(limit);
        Ok(log[start..].to_vec())
    }
}

/// In-memory [`RoomDirectory`] with a preloaded room set and open
/// membership: any user may join any existing room.
///
/// The real membership collaborator enforces join lists; this stand-in only
/// answers the existence question, which is all the core requires of it.
#[derive(Default)]
pub struct InMemoryRoomDirectory {
    rooms: Mutex<HashSet<String>>,
}

impl InMemoryRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory preloaded with the given room names.
    pub fn with_rooms<I, S>(rooms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rooms: Mutex::new(rooms.into_iter().map(Into::into).collect()),
        }
    }

    /// Register a room, as the room-CRUD layer would on creation.
    pub async fn create_room(&self, room: &str) {
        let mut rooms = self.rooms.lock().await;
        rooms.insert(room.to_string());
    }

    /// Remove a room, as the room-CRUD layer would on deletion.
    pub async fn remove_room(&self, room: &str) {
        let mut rooms = self.rooms.lock().await;
        rooms.remove(room);
    }
}

#[async_trait]
impl RoomDirectory for InMemoryRoomDirectory {
    async fn room_exists(&self, room: &str) -> Result<bool, DirectoryError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.contains(room))
    }

    async fn is_member(&self, room: &str, _user: &str) -> Result<bool, DirectoryError> {
        // Open membership: existence is the only gate.
        self.room_exists(room).await
    }
}
