//! Game event relay.
//!
//! Subscribes to the cache's publish channel and broadcasts every per-game
//! notification to the hub room of the same name as a `game_update` envelope.

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

use crate::{
    domain::{GameEvent, RoomName},
    infrastructure::{cache::CachePublication, dto::websocket::Envelope, hub::Hub},
};

pub fn spawn_game_event_relay(
    hub: Hub,
    mut events: broadcast::Receiver<CachePublication>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(publication) => {
                    forward(&hub, publication).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Game event relay lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("Game event relay stopped");
    })
}

/// Returns the number of room members the event was queued for.
pub(crate) async fn forward(hub: &Hub, publication: CachePublication) -> usize {
    let room = match RoomName::new(publication.channel.clone()) {
        Ok(room) => room,
        Err(e) => {
            tracing::warn!("Ignoring publication on '{}': {}", publication.channel, e);
            return 0;
        }
    };
    let event: GameEvent = match serde_json::from_str(&publication.payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Ignoring undecodable event on '{}': {}", room, e);
            return 0;
        }
    };

    let envelope = Envelope::game_update(room.as_str(), event);
    hub.broadcast_to_room(&room, &envelope).await
}
