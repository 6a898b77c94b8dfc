//! HTTP API request / response DTOs.
//!
//! Timestamps leave the server as RFC 3339 strings (UTC).

use rookery_shared::time::millis_to_rfc3339;
use serde::{Deserialize, Serialize};

use crate::domain::{
    GameOutcome, GameSession, GameStatus, GameView, MoveRecord, PlayerProfile, Side, Timestamp,
};

/// Body of create / join requests. The user id comes from the upstream authenticator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRequestDto {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeMoveRequestDto {
    pub user_id: String,
    pub from: String,
    pub to: String,
}

/// Error body for failed API calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponseDto {
    /// Error category (`validation`, `not_found`, `state_conflict`, `rule_violation`, `persistence`)
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDto {
    pub user_id: String,
    pub username: String,
}

impl From<PlayerProfile> for PlayerDto {
    fn from(profile: PlayerProfile) -> Self {
        Self {
            user_id: profile.user_id.into_string(),
            username: profile.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDto {
    pub id: String,
    pub arena_id: String,
    pub white: Option<String>,
    pub black: Option<String>,
    /// Display profile of the white seat, present on read endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_player: Option<PlayerDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black_player: Option<PlayerDto>,
    pub status: GameStatus,
    pub result: Option<GameOutcome>,
    pub current_turn: Side,
    pub position: String,
    pub move_count: u32,
    pub time_control_secs: u32,
    pub white_time_remaining: u32,
    pub black_time_remaining: u32,
    pub created_at: String,
    pub updated_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

fn rfc3339(timestamp: Timestamp) -> String {
    millis_to_rfc3339(timestamp.value())
}

impl From<GameSession> for GameDto {
    fn from(session: GameSession) -> Self {
        Self {
            id: session.id.to_string(),
            arena_id: session.arena_id.as_str().to_string(),
            white: session.white.map(|u| u.into_string()),
            black: session.black.map(|u| u.into_string()),
            white_player: None,
            black_player: None,
            status: session.status,
            result: session.result,
            current_turn: session.current_turn,
            position: session.position,
            move_count: session.move_count,
            time_control_secs: session.time_control_secs,
            white_time_remaining: session.white_time_remaining,
            black_time_remaining: session.black_time_remaining,
            created_at: rfc3339(session.created_at),
            updated_at: rfc3339(session.updated_at),
            started_at: session.started_at.map(rfc3339),
            finished_at: session.finished_at.map(rfc3339),
        }
    }
}

impl From<GameView> for GameDto {
    fn from(view: GameView) -> Self {
        Self {
            white_player: view.white_player.map(PlayerDto::from),
            black_player: view.black_player.map(PlayerDto::from),
            ..GameDto::from(view.session)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDto {
    pub game_id: String,
    pub move_number: u32,
    pub side: Side,
    pub player_id: String,
    pub from: String,
    pub to: String,
    pub piece: String,
    pub captured: bool,
    pub promotion: Option<String>,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub notation: String,
    pub position_after: String,
    pub time_remaining: u32,
    pub created_at: String,
}

impl From<MoveRecord> for MoveDto {
    fn from(record: MoveRecord) -> Self {
        Self {
            game_id: record.game_id.to_string(),
            move_number: record.move_number,
            side: record.side,
            player_id: record.player_id.into_string(),
            from: record.from.as_str().to_string(),
            to: record.to.as_str().to_string(),
            piece: record.piece,
            captured: record.captured,
            promotion: record.promotion,
            is_check: record.is_check,
            is_checkmate: record.is_checkmate,
            is_stalemate: record.is_stalemate,
            notation: record.notation,
            position_after: record.position_after,
            time_remaining: record.time_remaining,
            created_at: rfc3339(record.created_at),
        }
    }
}
