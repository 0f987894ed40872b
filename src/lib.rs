//! Multi-room WebSocket chat server library.
//!
//! Clients join named rooms over persistent WebSocket connections; each room
//! is owned by a single hub task that serializes membership changes and
//! message fan-out, and hands accepted messages off for durable storage.

pub mod common;
pub mod domain;
pub mod gateway;
pub mod hub;
pub mod server;
