//! Server state shared by every handler.

use std::sync::Arc;

use crate::{infrastructure::hub::Hub, usecase::GameSessionService};

/// Shared application state
pub struct AppState {
    /// Connection Hub（接続とルームの管理）
    pub hub: Hub,
    /// Game Session Service（対局のユースケース）
    pub game_service: Arc<GameSessionService>,
}
