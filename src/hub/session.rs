//! Session handles: the hub-facing side of one live connection.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Opaque identifier for one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A push into a session's outbound buffer failed.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionPushError {
    /// The bounded buffer is full: the member is not keeping up.
    BufferFull,
    /// The write loop is gone; the session is already closing.
    Closed,
}

/// The hub-facing handle of one connection session.
///
/// The hub holds the only long-lived copy of a session's handle, so its
/// membership map doubles as the liveness record: dropping the handle closes
/// the outbound channel, which ends the session's write loop.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    /// Sender identity, supplied by the authenticated caller and trusted
    /// as handed in.
    pub user: String,
    outbound: mpsc::Sender<String>,
}

impl SessionHandle {
    /// Create a handle and the receiving side of its bounded outbound
    /// buffer. The receiver is drained by the session's write loop.
    pub fn new(user: String, buffer_capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer_capacity);
        (
            Self {
                id: SessionId::generate(),
                user,
                outbound: tx,
            },
            rx,
        )
    }

    /// Push one serialized frame without blocking.
    pub(crate) fn try_push(&self, frame: String) -> Result<(), SessionPushError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SessionPushError::BufferFull,
            TrySendError::Closed(_) => SessionPushError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_push_delivers_until_buffer_is_full() {
        // given: a session with capacity 2 and no reader draining it
        let (session, mut rx) = SessionHandle::new("alice".to_string(), 2);

        // when:
        let first = session.try_push("one".to_string());
        let second = session.try_push("two".to_string());
        let third = session.try_push("three".to_string());

        // then: the third push observes a full buffer
        assert_eq!(first, Ok(()));
        assert_eq!(second, Ok(()));
        assert_eq!(third, Err(SessionPushError::BufferFull));
        assert_eq!(rx.try_recv(), Ok("one".to_string()));
        assert_eq!(rx.try_recv(), Ok("two".to_string()));
    }

    #[test]
    fn test_try_push_reports_closed_when_receiver_dropped() {
        // given:
        let (session, rx) = SessionHandle::new("alice".to_string(), 2);
        drop(rx);

        // when:
        let result = session.try_push("one".to_string());

        // then:
        assert_eq!(result, Err(SessionPushError::Closed));
    }

    #[test]
    fn test_session_ids_are_unique() {
        // given:
        let (a, _rx_a) = SessionHandle::new("alice".to_string(), 1);
        let (b, _rx_b) = SessionHandle::new("alice".to_string(), 1);

        // then:
        assert_ne!(a.id, b.id);
    }
}
