//! HTTP/WebSocket surface of the chat server.

mod handler;
mod runner;
mod signal;
mod state;

pub use runner::run_server;
pub use state::{AppState, ServerConfig};
