//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::{ArenaId, GameId, Square, UserId},
    infrastructure::dto::http::{
        ErrorResponseDto, GameDto, MakeMoveRequestDto, MoveDto, PlayerRequestDto,
    },
    ui::state::AppState,
    usecase::{ErrorKind, GameSessionError},
};

/// Game Session Service のエラーを HTTP レスポンスに変換する
pub struct ApiError(GameSessionError);

impl From<GameSessionError> for ApiError {
    fn from(error: GameSessionError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = match kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::StateConflict => StatusCode::CONFLICT,
            ErrorKind::RuleViolation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if kind == ErrorKind::Persistence {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }

        let body = ErrorResponseDto {
            error: kind.as_str().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn parse_game_id(value: &str) -> Result<GameId, ApiError> {
    GameId::parse(value).map_err(|e| GameSessionError::validation(e).into())
}

fn parse_user_id(value: String) -> Result<UserId, ApiError> {
    UserId::new(value).map_err(|e| GameSessionError::validation(e).into())
}

fn parse_arena_id(value: String) -> Result<ArenaId, ApiError> {
    ArenaId::new(value).map_err(|e| GameSessionError::validation(e).into())
}

fn parse_square(value: String) -> Result<Square, ApiError> {
    Square::new(value).map_err(|e| GameSessionError::validation(e).into())
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Create a game in an arena; the caller takes the white seat
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    Path(arena_id): Path<String>,
    Json(request): Json<PlayerRequestDto>,
) -> Result<(StatusCode, Json<GameDto>), ApiError> {
    let arena_id = parse_arena_id(arena_id)?;
    let creator = parse_user_id(request.user_id)?;

    let session = state.game_service.create_game(arena_id, creator).await?;
    Ok((StatusCode::CREATED, Json(GameDto::from(session))))
}

/// Get waiting and active games of an arena
pub async fn list_games(
    State(state): State<Arc<AppState>>,
    Path(arena_id): Path<String>,
) -> Result<Json<Vec<GameDto>>, ApiError> {
    let arena_id = parse_arena_id(arena_id)?;
    let views = state.game_service.get_active_games(&arena_id).await?;

    // Domain Model から DTO への変換
    Ok(Json(views.into_iter().map(GameDto::from).collect()))
}

/// Get game detail by ID
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<GameDto>, ApiError> {
    let game_id = parse_game_id(&game_id)?;
    let view = state.game_service.get_game(game_id).await?;
    Ok(Json(GameDto::from(view)))
}

/// Take the black seat of a waiting game
pub async fn join_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    Json(request): Json<PlayerRequestDto>,
) -> Result<Json<GameDto>, ApiError> {
    let game_id = parse_game_id(&game_id)?;
    let joiner = parse_user_id(request.user_id)?;

    let session = state.game_service.join_game(game_id, joiner).await?;
    Ok(Json(GameDto::from(session)))
}

/// Submit a move
pub async fn make_move(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    Json(request): Json<MakeMoveRequestDto>,
) -> Result<(StatusCode, Json<MoveDto>), ApiError> {
    let game_id = parse_game_id(&game_id)?;
    let player = parse_user_id(request.user_id)?;
    let from = parse_square(request.from)?;
    let to = parse_square(request.to)?;

    let record = state
        .game_service
        .make_move(game_id, player, from, to)
        .await?;
    Ok((StatusCode::CREATED, Json(MoveDto::from(record))))
}

/// Get the moves of a game in order
pub async fn list_moves(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<Vec<MoveDto>>, ApiError> {
    let game_id = parse_game_id(&game_id)?;
    let moves = state.game_service.list_moves(game_id).await?;
    Ok(Json(moves.into_iter().map(MoveDto::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_status_codes() {
        // テスト項目: エラー分類ごとに HTTP ステータスが決まる
        // given (前提条件):
        let game_id = GameId::generate();
        let cases = [
            (
                GameSessionError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (GameSessionError::NotFound(game_id), StatusCode::NOT_FOUND),
            (GameSessionError::NotActive(game_id), StatusCode::CONFLICT),
            (
                GameSessionError::IllegalMove("no piece on e3".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                GameSessionError::Persistence("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            // when (操作):
            let response = ApiError::from(error).into_response();

            // then (期待する結果):
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_invalid_game_id_is_validation_error() {
        // テスト項目: UUID でない対局 ID は 400 になる
        // given (前提条件):
        let raw = "not-a-uuid";

        // when (操作):
        let response = parse_game_id(raw).err().unwrap().into_response();

        // then (期待する結果):
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
