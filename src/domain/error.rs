//! Error taxonomy for the chat core.
//!
//! Per-session faults never propagate past the session boundary; gateway
//! failures never reach the hub's hot path.

use thiserror::Error;

/// An inbound frame failed validation at the session boundary.
///
/// Tolerated up to a configured threshold, then the session is closed.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("message body is empty")]
    EmptyBody,

    #[error("message body is {size} bytes, maximum is {max}")]
    BodyTooLarge { size: usize, max: usize },
}

/// Joining a room failed before a session was created.
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("user '{user}' is not a member of room '{room}'")]
    NotAMember { room: String, user: String },

    #[error("room directory unavailable: {0}")]
    DirectoryUnavailable(#[from] DirectoryError),
}

/// The message store failed to serve a request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message store unavailable: {0}")]
    Unavailable(String),
}

/// The room directory collaborator failed to serve a request.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("room directory unavailable: {0}")]
    Unavailable(String),
}
