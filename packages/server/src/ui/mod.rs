//! UI layer: axum server, handlers and the game event relay.

mod handler;
mod relay;
mod server;
mod signal;
pub mod state;

pub use relay::spawn_game_event_relay;
pub use server::Server;
