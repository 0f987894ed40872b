//! Domain model: chat messages, wire frames, and the error taxonomy.

mod error;
mod message;

pub use error::{DirectoryError, FrameError, JoinError, StoreError};
pub use message::{InboundFrame, OutboundFrame, StoredMessage};
