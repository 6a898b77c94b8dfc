//! Connection Hub
//!
//! ## 責務
//!
//! - 接続中クライアントの登録・削除（制御ループのメールボックス経由で直列化）
//! - Room のメンバー管理とブロードキャスト（RwLock で保護し、呼び出し元のタスクで直接実行）
//!
//! ## 送信ポリシー
//!
//! 送信は待たずにキューへ積むだけで、キューが満杯・クローズ済みのクライアントは
//! その場で切り離す（キューを閉じ、全 Room と接続一覧から除く）。
//! 遅いクライアントがブロードキャスト全体を止めることはない。

mod client;
mod registry;
mod rooms;

use std::sync::Arc;

use tokio::{
    sync::{RwLock, mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    domain::{ClientId, RoomName},
    infrastructure::dto::websocket::Envelope,
};

pub use client::{Client, Identity, OutboundMessage, TransportError};
use registry::{HubCommand, Registry};
use rooms::RoomTable;

/// Configuration for `Hub`.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of queued outbound messages per client.
    pub client_queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            client_queue_capacity: 256,
        }
    }
}

/// Handle to a running hub. Cheap to clone; the control loop stops once every
/// handle has been dropped.
#[derive(Clone)]
pub struct Hub {
    mailbox: mpsc::UnboundedSender<HubCommand>,
    rooms: Arc<RwLock<RoomTable>>,
    config: HubConfig,
}

impl Hub {
    /// Spawn the control loop on the current tokio runtime.
    pub fn start(config: HubConfig) -> (Self, JoinHandle<()>) {
        let rooms = Arc::new(RwLock::new(RoomTable::default()));
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let task = tokio::spawn(Registry::new(rooms.clone()).run(inbox));

        let hub = Self {
            mailbox,
            rooms,
            config,
        };
        (hub, task)
    }

    /// Create a client for an authenticated connection and register it.
    ///
    /// The returned receiver is the client's outbound queue; its first message
    /// is the `connection_established` greeting.
    pub fn connect(&self, identity: Identity) -> (Arc<Client>, mpsc::Receiver<OutboundMessage>) {
        let (client, rx) = Client::new(identity, self.config.client_queue_capacity);
        self.register(client.clone());
        (client, rx)
    }

    pub fn register(&self, client: Arc<Client>) {
        let client_id = client.id();
        if self.mailbox.send(HubCommand::Register(client.clone())).is_err() {
            tracing::error!("Hub is stopped; cannot register client '{}'", client_id);
            client.close();
        }
    }

    pub fn unregister(&self, client_id: ClientId) {
        if self.mailbox.send(HubCommand::Unregister(client_id)).is_err() {
            tracing::warn!("Hub is stopped; unregister of '{}' ignored", client_id);
        }
    }

    /// Number of registered clients, as seen by the control loop.
    pub async fn client_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.mailbox.send(HubCommand::ClientCount(reply)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Returns `false` if the client was already a member or is closed.
    pub async fn join_room(&self, client: &Arc<Client>, room: RoomName) -> bool {
        let mut rooms = self.rooms.write().await;
        if client.is_closed() {
            return false;
        }
        let joined = rooms.join(room.clone(), client.clone());
        if joined {
            tracing::debug!("Client '{}' joined room '{}'", client.id(), room);
        }
        joined
    }

    /// Returns `false` if the client was not a member.
    pub async fn leave_room(&self, client_id: &ClientId, room: &RoomName) -> bool {
        let left = self.rooms.write().await.leave(room, client_id);
        if left {
            tracing::debug!("Client '{}' left room '{}'", client_id, room);
        }
        left
    }

    pub async fn room_members(&self, room: &RoomName) -> Vec<ClientId> {
        self.rooms
            .read()
            .await
            .members(room)
            .map(|client| client.id())
            .collect()
    }

    pub async fn room_exists(&self, room: &RoomName) -> bool {
        self.rooms.read().await.contains_room(room)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.room_count()
    }

    /// Serialize once and enqueue on every current member of `room`.
    ///
    /// Returns the number of members the message was queued for. Members whose
    /// queue is full or closed are dropped from the hub.
    pub async fn broadcast_to_room(&self, room: &RoomName, envelope: &Envelope) -> usize {
        let message: OutboundMessage = match envelope.encode() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::error!(
                    "Failed to encode '{}' for room '{}': {}",
                    envelope.kind().as_str(),
                    room,
                    e
                );
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        {
            let rooms = self.rooms.read().await;
            for client in rooms.members(room) {
                match client.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        tracing::warn!("Broadcast to room '{}' failed: {}", room, e);
                        failed.push(client.clone());
                    }
                }
            }
        }

        for client in failed {
            self.drop_client(&client).await;
        }

        tracing::debug!(
            "Broadcasted '{}' to {} members of room '{}'",
            envelope.kind().as_str(),
            delivered,
            room
        );
        delivered
    }

    /// Enqueue a message for a single client, dropping it on failure.
    pub async fn send_to_client(
        &self,
        client: &Arc<Client>,
        envelope: &Envelope,
    ) -> Result<(), TransportError> {
        let message: OutboundMessage = match envelope.encode() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::error!(
                    "Failed to encode '{}' for client '{}': {}",
                    envelope.kind().as_str(),
                    client.id(),
                    e
                );
                return Ok(());
            }
        };

        if let Err(e) = client.try_send(message) {
            tracing::warn!("Send to client failed: {}", e);
            self.drop_client(client).await;
            return Err(e);
        }
        Ok(())
    }

    /// Close the queue, leave every room now, and have the control loop forget the client.
    async fn drop_client(&self, client: &Arc<Client>) {
        client.close();
        self.rooms.write().await.remove_client(&client.id());
        self.unregister(client.id());
    }
}
