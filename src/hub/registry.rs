//! Process-wide registry mapping room names to live hubs.
//!
//! The registry's map mutex is the only lock in the subsystem: hubs are
//! created and retired concurrently across rooms, while everything inside a
//! room is serialized by its hub's event loop.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;

use crate::common::time::Clock;
use crate::gateway::AppendSender;

use super::room::{HubHandle, RoomHub};
use super::session::SessionHandle;

/// The registry has been shut down and accepts no new sessions.
#[derive(Debug, thiserror::Error)]
#[error("hub registry is shut down")]
pub struct RegistryClosed;

struct RegistryInner {
    hubs: HashMap<String, HubHandle>,
    /// Cloned into every new hub; taken on shutdown so the append worker
    /// can drain once the last hub exits.
    appends: Option<AppendSender>,
}

/// Process-wide room-name → hub mapping with lazy hub creation.
pub struct HubRegistry {
    inner: Mutex<RegistryInner>,
    clock: Arc<dyn Clock>,
    /// Handed to each spawned hub so it can retire itself.
    me: Weak<HubRegistry>,
}

impl HubRegistry {
    pub fn new(appends: AppendSender, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            inner: Mutex::new(RegistryInner {
                hubs: HashMap::new(),
                appends: Some(appends),
            }),
            clock,
            me: me.clone(),
        })
    }

    /// Resolve the hub for a room and register the session into it.
    ///
    /// Creation is atomic under the map lock, so two concurrent joiners of a
    /// new room observe the same hub. If the resolved hub retired between
    /// resolve and register, the stale entry is dropped and the join retries
    /// into a fresh hub.
    pub async fn join(&self, room: &str, session: SessionHandle) -> Result<HubHandle, RegistryClosed> {
        loop {
            let hub = self.resolve(room).await?;
            match hub.register(session.clone()) {
                Ok(()) => return Ok(hub),
                Err(_) => {
                    // Lost the race against retirement; clear the entry if
                    // the retiring hub did not get to it yet.
                    self.retire(room, hub.hub_id()).await;
                }
            }
        }
    }

    /// Return the live hub for a room, creating and spawning one if needed.
    pub async fn resolve(&self, room: &str) -> Result<HubHandle, RegistryClosed> {
        let mut inner = self.inner.lock().await;
        let appends = inner.appends.clone().ok_or(RegistryClosed)?;

        if let Some(handle) = inner.hubs.get(room) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }

        let registry = self
            .me
            .upgrade()
            .expect("registry is always constructed inside an Arc");
        let (handle, hub) = RoomHub::new(room, appends, self.clock.clone());
        inner.hubs.insert(room.to_string(), handle.clone());
        tokio::spawn(hub.run(registry));
        tracing::info!("hub for room '{}' created", room);
        Ok(handle)
    }

    /// Remove the entry for a room, but only if it still maps to the given
    /// hub instance. Tolerates double retirement and entries already
    /// replaced by a fresh hub.
    pub(crate) async fn retire(&self, room: &str, hub_id: uuid::Uuid) {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.hubs.get(room) {
            if handle.hub_id() == hub_id {
                inner.hubs.remove(room);
                tracing::info!("hub for room '{}' retired", room);
            }
        }
    }

    /// Number of currently live hubs.
    pub async fn live_hub_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.hubs.len()
    }

    /// Shut down every live hub and stop accepting new sessions.
    ///
    /// Each hub closes its members' sessions as it exits; in-flight
    /// persistence is the append worker's concern.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.appends = None;
        for (_, handle) in inner.hubs.drain() {
            handle.shutdown();
        }
    }
}
