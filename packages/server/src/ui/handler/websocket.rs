//! WebSocket connection handlers.
//!
//! A connection goes through three stages:
//!
//! 1. Admitting: the token and room are checked before the upgrade. A
//!    rejected connection never touches a room.
//! 2. Joined: the connection is registered. The writer task replays the
//!    history snapshot oldest first, then drains the outbound queue, while
//!    inbound frames are read until the transport closes.
//! 3. Closed: the connection leaves the room.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{
    sink::{Sink, SinkExt},
    stream::StreamExt,
};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ChatMessage, OutboundReceiver},
    infrastructure::dto::websocket::MessageDto,
    ui::state::AppState,
    usecase::{Admission, ConnectError},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
    pub room: Option<String>,
}

pub async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let admission = match state
        .connect_participant_usecase
        .admit(query.token.as_deref(), query.room.as_deref())
    {
        Ok(admission) => admission,
        Err(ConnectError::Unauthorized(e)) => {
            tracing::warn!("Rejecting connection: {}", e);
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Err(ConnectError::InvalidRoom(e)) => {
            tracing::warn!("Rejecting connection: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, admission))
}

fn encode(message: &ChatMessage) -> Option<Message> {
    match serde_json::to_string(&MessageDto::from(message)) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("Failed to encode message: {}", e);
            None
        }
    }
}

/// Capacity of a connection's outbound queue.
///
/// The replayed history is written before the first queued message, so the
/// queue reserves room for a full history on top of the live-traffic budget.
fn queue_capacity(outbound_capacity: usize, history_limit: usize) -> usize {
    outbound_capacity + history_limit
}

/// Spawns a task that writes the history snapshot, then drains the outbound
/// queue into the WebSocket sink.
///
/// The task ends when the queue closes (the registry dropped this client) or
/// when a write fails.
fn pusher_loop<S>(
    history: Vec<Arc<ChatMessage>>,
    mut rx: OutboundReceiver,
    sender: S,
) -> tokio::task::JoinHandle<()>
where
    S: Sink<Message> + Send + 'static,
{
    tokio::spawn(async move {
        let mut sender = Box::pin(sender);

        for message in &history {
            let Some(frame) = encode(message) else {
                continue;
            };
            if sender.send(frame).await.is_err() {
                tracing::warn!("Failed to replay history");
                return;
            }
        }

        while let Some(message) = rx.recv().await {
            let Some(frame) = encode(&message) else {
                continue;
            };
            if sender.send(frame).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, admission: Admission) {
    let (sender, mut receiver) = socket.split();

    let (tx, rx) = mpsc::channel(queue_capacity(
        state.outbound_capacity,
        state.history_limit,
    ));
    let joined = state
        .connect_participant_usecase
        .join(&admission, tx)
        .await;

    // Spawn a task to replay history, then push queued messages to this client
    let mut send_task = pusher_loop(joined.history, rx, sender);

    let recv_state = state.clone();
    let identity = admission.identity.clone();
    let room = admission.room.clone();

    // Spawn a task to receive messages from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    recv_state
                        .send_message_usecase
                        .execute(&identity, &room, text.to_string())
                        .await;
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("'{}' requested close", identity);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("WebSocket read error for '{}': {}", identity, e);
                    break;
                }
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state
        .disconnect_participant_usecase
        .execute(&admission.room, &joined.connection_id)
        .await;
}
