//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::common::time::SystemClock;
use crate::gateway::{MessageStore, RoomDirectory, spawn_append_worker};
use crate::hub::HubRegistry;

use super::handler::{get_recent_messages, health_check, live_chat_handler};
use super::signal::shutdown_signal;
use super::state::{AppState, ServerConfig};

/// Run the chat server until a shutdown signal arrives.
///
/// Shutdown proceeds in order: stop accepting connections, close every live
/// session through its hub, then give in-flight persistence a bounded grace
/// period before forcing the append worker down.
pub async fn run_server(
    config: ServerConfig,
    directory: Arc<dyn RoomDirectory>,
    store: Arc<dyn MessageStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (appends, mut append_worker) = spawn_append_worker(store.clone());
    let registry = HubRegistry::new(appends, Arc::new(SystemClock));

    let state = Arc::new(AppState {
        registry: registry.clone(),
        directory,
        store,
        config: config.clone(),
    });

    let app = Router::new()
        .route("/chat/{room_name}", get(live_chat_handler))
        .route("/api/chat/{room_name}/{limit}", get(get_recent_messages))
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("chat server listening on {}", listener.local_addr()?);
    tracing::info!("connect to: ws://{}/chat/{{room_name}}?user=<name>", bind_addr);
    tracing::info!("press Ctrl+C to shutdown gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("closing live sessions");
    registry.shutdown().await;

    // The worker exits once the hubs are gone and the append channel is
    // drained; anything slower than the grace period is forced down.
    if tokio::time::timeout(config.shutdown_grace, &mut append_worker)
        .await
        .is_err()
    {
        tracing::warn!(
            "persistence did not drain within {:?}, aborting append worker",
            config.shutdown_grace
        );
        append_worker.abort();
    }

    tracing::info!("server shutdown complete");

    Ok(())
}
