//! HTTP and WebSocket handlers.

mod http;
mod websocket;

pub use http::{create_game, get_game, health_check, join_game, list_games, list_moves, make_move};
pub use websocket::websocket_handler;
