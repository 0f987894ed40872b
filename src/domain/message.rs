//! Chat message types and wire-frame validation.
//!
//! Validation lives here, at the session boundary: the hub only ever sees
//! well-formed messages.

use serde::{Deserialize, Serialize};

use crate::common::time::timestamp_to_rfc3339;

use super::error::FrameError;

/// Maximum accepted message body size in bytes.
pub const MAX_BODY_BYTES: usize = 4096;

/// Inbound wire frame sent by a client over an established session.
///
/// Room and sender are bound by the session, so the frame carries only the
/// body.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    pub body: String,
}

impl InboundFrame {
    /// Parse and validate one text frame.
    ///
    /// # Returns
    ///
    /// * `Ok(InboundFrame)` - the frame parsed and passed validation
    /// * `Err(FrameError)` - malformed JSON, empty body, or oversized body
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let frame: InboundFrame = serde_json::from_str(text)?;
        if frame.body.trim().is_empty() {
            return Err(FrameError::EmptyBody);
        }
        if frame.body.len() > MAX_BODY_BYTES {
            return Err(FrameError::BodyTooLarge {
                size: frame.body.len(),
                max: MAX_BODY_BYTES,
            });
        }
        Ok(frame)
    }
}

/// A chat message as accepted by a room hub and handed to the message store.
///
/// The timestamp is assigned by the server at acceptance and never trusted
/// from the client. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub room: String,
    pub sender: String,
    pub body: String,
    pub timestamp_millis: i64,
}

impl StoredMessage {
    pub fn new(room: String, sender: String, body: String, timestamp_millis: i64) -> Self {
        Self {
            room,
            sender,
            body,
            timestamp_millis,
        }
    }

    /// Build the outbound wire form of this message.
    pub fn to_frame(&self) -> OutboundFrame {
        OutboundFrame {
            room: self.room.clone(),
            sender: self.sender.clone(),
            body: self.body.clone(),
            timestamp: timestamp_to_rfc3339(self.timestamp_millis),
        }
    }
}

/// Outbound wire frame broadcast to room members (and returned by the
/// history endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub room: String,
    pub sender: String,
    pub body: String,
    /// Server-assigned acceptance time, RFC 3339 (UTC).
    pub timestamp: String,
}
