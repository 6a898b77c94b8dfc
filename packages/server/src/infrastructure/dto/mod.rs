//! Data Transfer Objects (DTOs) for the session layer.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket message envelope
//! - `http`: HTTP API request / response bodies

pub mod http;
pub mod websocket;
