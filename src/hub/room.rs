//! The per-room hub task.
//!
//! A hub is the single authority over one room's membership and message
//! ordering. All register / unregister / publish events flow through one
//! mpsc channel drained by one task, so every per-room invariant holds
//! without any lock inside the hub.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::common::time::Clock;
use crate::domain::StoredMessage;
use crate::gateway::AppendSender;

use super::registry::HubRegistry;
use super::session::{SessionHandle, SessionId, SessionPushError};

/// Events serialized through a hub's event loop.
#[derive(Debug)]
pub(crate) enum HubEvent {
    Register(SessionHandle),
    Unregister(SessionId),
    Publish { sender: String, body: String },
    Shutdown,
}

/// Cloneable handle to a running room hub.
///
/// All methods are fire-and-forget sends into the hub's event stream; a
/// send to a hub that has already exited is silently dropped (the handle
/// holder is about to observe the closure anyway).
#[derive(Debug, Clone)]
pub struct HubHandle {
    hub_id: Uuid,
    room: Arc<str>,
    events: mpsc::UnboundedSender<HubEvent>,
}

/// The hub this handle pointed at has exited.
#[derive(Debug, thiserror::Error)]
#[error("hub for room '{0}' has exited")]
pub(crate) struct HubClosed(pub String);

impl HubHandle {
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Identity of the hub instance behind this handle. Two hubs for the
    /// same room name (one retired, one fresh) have distinct ids.
    pub(crate) fn hub_id(&self) -> Uuid {
        self.hub_id
    }

    /// Add a session to the member set.
    ///
    /// Fails only if the hub raced to retirement; the caller re-resolves
    /// and registers into a fresh hub.
    pub(crate) fn register(&self, session: SessionHandle) -> Result<(), HubClosed> {
        self.events
            .send(HubEvent::Register(session))
            .map_err(|_| HubClosed(self.room.to_string()))
    }

    /// Remove a session from the member set. Idempotent: unknown ids and
    /// already-exited hubs are no-ops.
    pub fn unregister(&self, session_id: SessionId) {
        let _ = self.events.send(HubEvent::Unregister(session_id));
    }

    /// Submit one validated message for persistence and fan-out.
    pub fn publish(&self, sender: impl Into<String>, body: impl Into<String>) {
        let _ = self.events.send(HubEvent::Publish {
            sender: sender.into(),
            body: body.into(),
        });
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.events.send(HubEvent::Shutdown);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

/// One room's hub state, owned by its event-loop task.
pub(crate) struct RoomHub {
    room: String,
    hub_id: Uuid,
    members: HashMap<SessionId, SessionHandle>,
    events: mpsc::UnboundedReceiver<HubEvent>,
    appends: AppendSender,
    clock: Arc<dyn Clock>,
}

impl RoomHub {
    pub(crate) fn new(
        room: &str,
        appends: AppendSender,
        clock: Arc<dyn Clock>,
    ) -> (HubHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub_id = Uuid::new_v4();
        let handle = HubHandle {
            hub_id,
            room: Arc::from(room),
            events: tx,
        };
        let hub = Self {
            room: room.to_string(),
            hub_id,
            members: HashMap::new(),
            events: rx,
            appends,
            clock,
        };
        (handle, hub)
    }

    /// Drive the hub until it retires (member set empties) or the process
    /// shuts down.
    pub(crate) async fn run(mut self, registry: Arc<HubRegistry>) {
        tracing::debug!("hub for room '{}' started", self.room);

        while let Some(event) = self.events.recv().await {
            match event {
                HubEvent::Register(session) => self.handle_register(session),
                HubEvent::Unregister(session_id) => {
                    self.handle_unregister(session_id);
                    if self.members.is_empty() {
                        self.retire(&registry).await;
                        return;
                    }
                }
                HubEvent::Publish { sender, body } => {
                    self.handle_publish(sender, body);
                    // Evicting a slow consumer can empty the room too.
                    if self.members.is_empty() {
                        self.retire(&registry).await;
                        return;
                    }
                }
                HubEvent::Shutdown => {
                    tracing::info!(
                        "hub for room '{}' shutting down, closing {} session(s)",
                        self.room,
                        self.members.len()
                    );
                    // Dropping the handles closes every member's write loop.
                    self.members.clear();
                    return;
                }
            }
        }
    }

    fn handle_register(&mut self, session: SessionHandle) {
        tracing::debug!(
            "room '{}': session {} ({}) registered",
            self.room,
            session.id,
            session.user
        );
        self.members.insert(session.id, session);
    }

    fn handle_unregister(&mut self, session_id: SessionId) {
        // No-op if absent: covers double-close races.
        if self.members.remove(&session_id).is_some() {
            tracing::debug!("room '{}': session {} unregistered", self.room, session_id);
        }
    }

    fn handle_publish(&mut self, sender: String, body: String) {
        let timestamp = self.clock.now_millis();
        let message = StoredMessage::new(self.room.clone(), sender, body, timestamp);

        // Hand off for durable storage first; the worker preserves this
        // order, so persistence order matches broadcast order. The channel
        // only closes during process shutdown, after every hub has exited.
        if self.appends.send(message.clone()).is_err() {
            tracing::error!(
                "room '{}': append worker gone, message from '{}' not persisted",
                self.room,
                message.sender
            );
        }

        let frame = serde_json::to_string(&message.to_frame())
            .expect("outbound frame serialization cannot fail");

        // Fan out to every member, sender included: the echo carries the
        // server-assigned timestamp and ordering back to the sender's UI.
        let mut evicted: Vec<SessionId> = Vec::new();
        for (session_id, member) in &self.members {
            match member.try_push(frame.clone()) {
                Ok(()) => {}
                Err(SessionPushError::BufferFull) => {
                    tracing::warn!(
                        "room '{}': session {} ({}) not keeping up, evicting",
                        self.room,
                        session_id,
                        member.user
                    );
                    evicted.push(*session_id);
                }
                Err(SessionPushError::Closed) => {
                    // Write loop already gone; the unregister is in flight.
                    evicted.push(*session_id);
                }
            }
        }
        for session_id in evicted {
            self.members.remove(&session_id);
        }
    }

    /// Remove this hub from the registry, then drain events that were
    /// already buffered when retirement was decided.
    async fn retire(&mut self, registry: &Arc<HubRegistry>) {
        registry.retire(&self.room, self.hub_id).await;
        self.events.close();

        while let Some(event) = self.events.recv().await {
            if let HubEvent::Register(session) = event {
                // The session raced hub retirement; dropping its handle
                // closes it and the client reconnects into a fresh hub.
                tracing::debug!(
                    "room '{}': session {} registered into retiring hub, closing it",
                    self.room,
                    session.id
                );
            }
        }
        tracing::debug!("hub for room '{}' retired", self.room);
    }
}
