//! Server configuration and shared state.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::gateway::{MessageStore, RoomDirectory};
use crate::hub::HubRegistry;

/// Tunables for the running server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port number to bind to.
    pub port: u16,
    /// Capacity of each session's outbound buffer. The bound is what makes
    /// the slow-consumer eviction policy deterministic.
    pub outbound_buffer: usize,
    /// Number of malformed inbound frames tolerated before a session is
    /// closed.
    pub malformed_frame_limit: u32,
    /// Upper bound applied to the `limit` path parameter of the history
    /// endpoint.
    pub history_limit_max: usize,
    /// Grace period for in-flight persistence during shutdown.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            outbound_buffer: 32,
            malformed_frame_limit: 5,
            history_limit_max: 100,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Query parameters for the WebSocket upgrade.
///
/// The identity is supplied by the authenticated caller and trusted as
/// handed in; verification belongs to the auth collaborator in front.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user: String,
}

/// Shared application state
pub struct AppState {
    /// Room-name to hub mapping
    pub registry: Arc<HubRegistry>,
    /// Room metadata / membership collaborator
    pub directory: Arc<dyn RoomDirectory>,
    /// Durable message storage, read side (history endpoint)
    pub store: Arc<dyn MessageStore>,
    pub config: ServerConfig,
}
