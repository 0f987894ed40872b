//! Multi-room WebSocket chat server.
//!
//! Clients join a room with `ws://host:port/chat/{room_name}?user=<name>`
//! and exchange `{"body": "..."}` frames; history is served from
//! `GET /api/chat/{room_name}/{limit}`.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin server
//! cargo run --bin server -- --host 0.0.0.0 --port 3000 --rooms general,random
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use roomcast::common::logger::setup_logger;
use roomcast::gateway::{InMemoryMessageStore, InMemoryRoomDirectory};
use roomcast::server::{ServerConfig, run_server};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Multi-room WebSocket chat server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Rooms preloaded into the in-memory room directory
    #[arg(long, value_delimiter = ',', default_value = "general")]
    rooms: Vec<String>,

    /// Per-session outbound buffer capacity
    #[arg(long, default_value = "32")]
    outbound_buffer: usize,

    /// Malformed inbound frames tolerated before a session is closed
    #[arg(long, default_value = "5")]
    malformed_frame_limit: u32,

    /// Upper bound of the history endpoint's limit parameter
    #[arg(long, default_value = "100")]
    history_limit_max: usize,

    /// Seconds granted to in-flight persistence during shutdown
    #[arg(long, default_value = "5")]
    shutdown_grace_secs: u64,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        outbound_buffer: args.outbound_buffer,
        malformed_frame_limit: args.malformed_frame_limit,
        history_limit_max: args.history_limit_max,
        shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
    };

    // In-memory collaborators; a deployment wires DBMS-backed ones here.
    let directory = Arc::new(InMemoryRoomDirectory::with_rooms(args.rooms.clone()));
    let store = Arc::new(InMemoryMessageStore::new());
    tracing::info!("rooms available: {}", args.rooms.join(", "));

    if let Err(e) = run_server(config, directory, store).await {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }
}
