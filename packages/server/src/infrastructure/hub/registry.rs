//! Hub control loop.
//!
//! The set of live clients is owned by a single task and only changes through
//! its mailbox, so registration and removal are applied one at a time in the
//! order they were requested.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{RwLock, mpsc, oneshot};

use crate::{domain::ClientId, infrastructure::dto::websocket::Envelope};

use super::{client::Client, rooms::RoomTable};

pub(super) enum HubCommand {
    Register(Arc<Client>),
    Unregister(ClientId),
    ClientCount(oneshot::Sender<usize>),
}

pub(super) struct Registry {
    clients: HashMap<ClientId, Arc<Client>>,
    rooms: Arc<RwLock<RoomTable>>,
}

impl Registry {
    pub(super) fn new(rooms: Arc<RwLock<RoomTable>>) -> Self {
        Self {
            clients: HashMap::new(),
            rooms,
        }
    }

    pub(super) async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<HubCommand>) {
        tracing::debug!("Hub control loop started");

        while let Some(command) = mailbox.recv().await {
            match command {
                HubCommand::Register(client) => self.register(client).await,
                HubCommand::Unregister(client_id) => self.unregister(&client_id).await,
                HubCommand::ClientCount(reply) => {
                    let _ = reply.send(self.clients.len());
                }
            }
        }

        // Every hub handle is gone; release the remaining connections.
        for client in self.clients.values() {
            client.close();
        }
        tracing::debug!(
            "Hub control loop stopped ({} clients released)",
            self.clients.len()
        );
    }

    async fn register(&mut self, client: Arc<Client>) {
        let client_id = client.id();
        let greeting = match Envelope::connection_established(client_id).encode() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to encode connection_established: {}", e);
                client.close();
                return;
            }
        };

        self.clients.insert(client_id, client.clone());
        tracing::info!(
            "Client '{}' registered for user '{}' ({} live)",
            client_id,
            client.identity().user_id,
            self.clients.len()
        );

        if let Err(e) = client.try_send(Arc::from(greeting)) {
            tracing::warn!("Dropping client '{}' during registration: {}", client_id, e);
            self.unregister(&client_id).await;
        }
    }

    async fn unregister(&mut self, client_id: &ClientId) {
        let registered = self.clients.remove(client_id);
        if let Some(client) = &registered {
            client.close();
        }

        let left = self.rooms.write().await.remove_client(client_id);

        if registered.is_some() {
            tracing::info!(
                "Client '{}' unregistered (left {} rooms, {} live)",
                client_id,
                left.len(),
                self.clients.len()
            );
        }
    }
}
