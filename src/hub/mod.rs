//! The room hub and live-connection broadcast engine.
//!
//! One hub task per live room serializes membership changes and message
//! fan-out; the registry maps room names to their hubs. Sessions bridge a
//! WebSocket to the hub's message model through a bounded outbound buffer.

mod registry;
mod room;
mod session;

pub use registry::{HubRegistry, RegistryClosed};
pub use room::HubHandle;
pub use session::{SessionHandle, SessionId, SessionPushError};
