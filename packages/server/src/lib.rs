//! Rookery session layer.
//!
//! Real-time multiplayer plumbing behind a turn-based chess game:
//! a Connection Hub that fans WebSocket messages out to rooms, and a
//! Game Session Service that keeps an authoritative, turn-ordered game state
//! across a fast cache and a durable store.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
