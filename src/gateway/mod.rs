//! Persistence and room-metadata collaborators.
//!
//! The chat core never talks to storage directly: it depends on the
//! [`MessageStore`] and [`RoomDirectory`] traits and hands accepted messages
//! to a sequential append worker. Concrete backends live behind these
//! traits; in-memory implementations are provided for single-process
//! deployments and tests.

mod memory;
mod worker;

use async_trait::async_trait;

use crate::domain::{DirectoryError, StoredMessage, StoreError};

pub use memory::{InMemoryMessageStore, InMemoryRoomDirectory};
pub use worker::{spawn_append_worker, AppendSender, AppendWorker};

/// Durable message storage for chat rooms.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Durably record one chat message.
    async fn append(&self, message: StoredMessage) -> Result<(), StoreError>;

    /// List the most recent `limit` messages of a room, oldest first.
    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<StoredMessage>, StoreError>;
}

/// Room metadata and membership, owned by the external CRUD layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Whether a room with this name has been created.
    async fn room_exists(&self, room: &str) -> Result<bool, DirectoryError>;

    /// Whether the user is allowed to join the room.
    async fn is_member(&self, room: &str, user: &str) -> Result<bool, DirectoryError>;
}
