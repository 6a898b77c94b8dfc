//! WebSocket connection handlers.
//!
//! Each connection runs two loops: the inbound loop decodes envelopes and
//! dispatches them to the hub, the outbound loop (`pusher_loop`) drains the
//! client's queue to the socket. When either ends, the other is aborted and
//! the client is unregistered.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{RoomName, UserId},
    infrastructure::{
        dto::websocket::{Envelope, MessageType},
        hub::{Client, Hub, Identity, OutboundMessage},
    },
    ui::state::AppState,
};

/// Query parameters for WebSocket connection, filled in by the upstream authenticator
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: String,
    pub username: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let user_id = match UserId::new(query.user_id.clone()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Rejecting connection with user_id '{}': {}", query.user_id, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    let username = query
        .username
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| user_id.as_str().to_string());
    let identity = Identity { user_id, username };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

/// Spawns a task that drains the client's outbound queue into the WebSocket sender.
///
/// The queue ends when the hub closes the client (unregister or slow-consumer drop).
fn pusher_loop(
    mut rx: mpsc::Receiver<OutboundMessage>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.to_string().into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: Identity) {
    let (client, rx) = state.hub.connect(identity);
    let client_id = client.id();
    tracing::info!(
        "Client '{}' connected as '{}'",
        client_id,
        client.identity().user_id
    );

    let (sender, mut receiver) = socket.split();

    // Spawn a task to receive messages from this client
    let hub = state.hub.clone();
    let inbound_client = client.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", inbound_client.id(), e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    dispatch_text(&hub, &inbound_client, text.as_str()).await;
                }
                Message::Binary(_) => {
                    tracing::debug!("Ignoring binary frame from '{}'", inbound_client.id());
                }
                Message::Close(_) => {
                    tracing::info!("Client '{}' requested close", inbound_client.id());
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => {}
            }
        }
    });

    // Spawn a task to push queued messages to this client
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.hub.unregister(client_id);
    tracing::info!("Client '{}' disconnected", client_id);
}

/// Decode one inbound text frame and act on it.
///
/// Invalid or unroutable messages are logged and dropped; nothing is sent back.
pub(crate) async fn dispatch_text(hub: &Hub, client: &Arc<Client>, text: &str) {
    let mut envelope = match Envelope::decode(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("Dropping message from '{}': {}", client.id(), e);
            return;
        }
    };
    let identity = client.identity();
    envelope.stamp_identity(&identity.user_id, &identity.username);

    match envelope.kind() {
        MessageType::JoinRoom => {
            if let Some(room) = target_room(client, &envelope) {
                hub.join_room(client, room).await;
            }
        }
        MessageType::LeaveRoom => {
            if let Some(room) = target_room(client, &envelope) {
                hub.leave_room(&client.id(), &room).await;
            }
        }
        MessageType::ChatMessage
        | MessageType::GameMove
        | MessageType::AvatarPosition
        | MessageType::AvatarAnimation => {
            if let Some(room) = target_room(client, &envelope) {
                hub.broadcast_to_room(&room, &envelope).await;
            }
        }
        MessageType::ConnectionEstablished | MessageType::GameUpdate => {
            tracing::warn!(
                "Dropping server-only '{}' from '{}'",
                envelope.kind().as_str(),
                client.id()
            );
        }
    }
}

fn target_room(client: &Client, envelope: &Envelope) -> Option<RoomName> {
    let Some(name) = envelope.target_room() else {
        tracing::warn!(
            "Dropping '{}' from '{}': no room given",
            envelope.kind().as_str(),
            client.id()
        );
        return None;
    };
    match RoomName::new(name.to_string()) {
        Ok(room) => Some(room),
        Err(e) => {
            tracing::warn!(
                "Dropping '{}' from '{}': {}",
                envelope.kind().as_str(),
                client.id(),
                e
            );
            None
        }
    }
}
