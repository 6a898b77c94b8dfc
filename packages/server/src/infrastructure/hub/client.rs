//! Per-connection handle owned by the hub.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::{ClientId, UserId};

/// Serialized envelope shared by every recipient of a broadcast.
pub type OutboundMessage = Arc<str>;

/// Authenticated identity attached to a connection by the upstream authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("outbound queue of client '{0}' is full")]
    QueueFull(ClientId),

    #[error("client '{0}' is closed")]
    Closed(ClientId),
}

/// A live connection: identity plus the sending half of its bounded outbound queue.
///
/// Closing drops the sender, which ends the connection's outbound pump.
#[derive(Debug)]
pub struct Client {
    id: ClientId,
    identity: Identity,
    sender: Mutex<Option<mpsc::Sender<OutboundMessage>>>,
}

impl Client {
    pub fn new(
        identity: Identity,
        queue_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let client = Self {
            id: ClientId::generate(),
            identity,
            sender: Mutex::new(Some(tx)),
        };
        (Arc::new(client), rx)
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Enqueue without waiting; a full queue is an error, never a wait.
    pub fn try_send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err(TransportError::Closed(self.id));
        };
        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::QueueFull(self.id),
            TrySendError::Closed(_) => TransportError::Closed(self.id),
        })
    }

    pub fn close(&self) {
        let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.take().is_some() {
            tracing::debug!("Outbound queue of client '{}' closed", self.id);
        }
    }

    pub fn is_closed(&self) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        sender.as_ref().is_none_or(|s| s.is_closed())
    }
}
