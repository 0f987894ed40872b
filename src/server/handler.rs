//! WebSocket and HTTP endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::sync::mpsc;

use crate::domain::{InboundFrame, JoinError, OutboundFrame};
use crate::gateway::RoomDirectory;
use crate::hub::{HubHandle, SessionHandle};

use super::state::{AppState, ConnectQuery};

/// Check the room-metadata collaborator before any hub or session state is
/// created.
async fn authorize_join(
    directory: &dyn RoomDirectory,
    room: &str,
    user: &str,
) -> Result<(), JoinError> {
    if !directory.room_exists(room).await? {
        return Err(JoinError::RoomNotFound(room.to_string()));
    }
    if !directory.is_member(room, user).await? {
        return Err(JoinError::NotAMember {
            room: room.to_string(),
            user: user.to_string(),
        });
    }
    Ok(())
}

/// Live-room endpoint: upgrade into a room-bound WebSocket session.
pub async fn live_chat_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_name): Path<String>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = query.user;

    if let Err(e) = authorize_join(state.directory.as_ref(), &room_name, &user).await {
        tracing::warn!("join rejected: {}", e);
        return Err(match e {
            JoinError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            JoinError::NotAMember { .. } => StatusCode::FORBIDDEN,
            JoinError::DirectoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        });
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_name, user)))
}

/// Bridge one accepted WebSocket to its room hub.
///
/// Spawns the session's two loops: the read loop is the only consumer of
/// the transport, the write loop its only producer, so frames are never
/// interleaved from multiple writers.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room: String, user: String) {
    let (session, outbound_rx) = SessionHandle::new(user.clone(), state.config.outbound_buffer);
    let session_id = session.id;

    let hub = match state.registry.join(&room, session).await {
        Ok(hub) => hub,
        Err(e) => {
            // Shutdown raced the upgrade; the socket just drops.
            tracing::warn!("session for '{}' rejected: {}", user, e);
            return;
        }
    };
    tracing::info!(
        "user '{}' joined room '{}' (session {})",
        user,
        hub.room(),
        session_id
    );

    let (ws_sender, ws_receiver) = socket.split();

    let mut send_task = tokio::spawn(write_loop(outbound_rx, ws_sender));
    let mut recv_task = tokio::spawn(read_loop(
        ws_receiver,
        hub.clone(),
        user.clone(),
        state.config.malformed_frame_limit,
    ));

    // Either loop ending tears down the other.
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // No-op if the hub already evicted this session.
    hub.unregister(session_id);
    tracing::info!("user '{}' left room '{}' (session {})", user, room, session_id);
}

/// Drain the bounded outbound buffer into the transport.
///
/// Ends when the hub drops the session handle (eviction or shutdown) or the
/// transport rejects a write.
async fn write_loop(
    mut outbound_rx: mpsc::Receiver<String>,
    mut ws_sender: SplitSink<WebSocket, Message>,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if ws_sender.send(Message::Text(frame.into())).await.is_err() {
            break;
        }
    }
    let _ = ws_sender.close().await;
}

/// Tracks malformed inbound frames against the configured tolerance.
///
/// Well-formed frames do not touch the budget: only malformed input counts
/// towards closing the session.
struct MalformedFrameBudget {
    seen: u32,
    limit: u32,
}

impl MalformedFrameBudget {
    fn new(limit: u32) -> Self {
        Self { seen: 0, limit }
    }

    /// Record one malformed frame. Returns `true` once the session has
    /// exhausted its tolerance and should be closed.
    fn record(&mut self) -> bool {
        self.seen += 1;
        self.seen >= self.limit
    }

    fn seen(&self) -> u32 {
        self.seen
    }
}

/// Receive inbound frames and publish well-formed messages to the hub.
///
/// Malformed frames are skipped up to the configured limit so a transient
/// client bug does not cost the connection; past the limit the session is
/// treated as faulty and closed.
async fn read_loop(
    mut ws_receiver: SplitStream<WebSocket>,
    hub: HubHandle,
    user: String,
    malformed_frame_limit: u32,
) {
    let mut budget = MalformedFrameBudget::new(malformed_frame_limit);

    while let Some(msg) = ws_receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("websocket error for user '{}': {}", user, e);
                break;
            }
        };

        match msg {
            Message::Text(text) => match InboundFrame::parse(&text) {
                Ok(frame) => hub.publish(user.clone(), frame.body),
                Err(e) => {
                    let exhausted = budget.record();
                    tracing::warn!(
                        "malformed frame from user '{}' ({}/{}): {}",
                        user,
                        budget.seen(),
                        malformed_frame_limit,
                        e
                    );
                    if exhausted {
                        tracing::warn!(
                            "user '{}' exceeded malformed frame limit, closing session",
                            user
                        );
                        break;
                    }
                }
            },
            Message::Close(_) => {
                tracing::debug!("user '{}' requested close", user);
                break;
            }
            // Ping/pong is handled by the protocol layer; binary is ignored.
            _ => {}
        }
    }
}

/// History endpoint: the most recent `limit` messages of a room, oldest
/// first.
pub async fn get_recent_messages(
    State(state): State<Arc<AppState>>,
    Path((room_name, limit)): Path<(String, usize)>,
) -> Result<Json<Vec<OutboundFrame>>, StatusCode> {
    match state.directory.room_exists(&room_name).await {
        Ok(true) => {}
        Ok(false) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("room directory unavailable: {}", e);
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
    }

    let limit = limit.min(state.config.history_limit_max);
    match state.store.recent(&room_name, limit).await {
        Ok(messages) => Ok(Json(messages.iter().map(|m| m.to_frame()).collect())),
        Err(e) => {
            tracing::error!("failed to read history for room '{}': {}", room_name, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
