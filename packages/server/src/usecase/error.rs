//! UseCase layer errors.

use thiserror::Error;

use crate::domain::{CacheError, DomainError, GameId, RepositoryError, UserId};

/// Error category, used by callers to pick a response (e.g. an HTTP status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request
    Validation,
    /// Unknown game or user
    NotFound,
    /// Game not joinable, already seated, wrong turn, not active
    StateConflict,
    /// Move rejected by the rule engine
    RuleViolation,
    /// Store or cache failure
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::StateConflict => "state_conflict",
            ErrorKind::RuleViolation => "rule_violation",
            ErrorKind::Persistence => "persistence",
        }
    }
}

/// Game Session Service errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameSessionError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("game '{0}' not found")]
    NotFound(GameId),

    #[error("game '{0}' is not waiting for an opponent")]
    NotJoinable(GameId),

    #[error("player '{0}' already holds a seat in this game")]
    AlreadyInGame(UserId),

    #[error("it is not player '{0}'s turn")]
    NotYourTurn(UserId),

    #[error("game '{0}' is not active")]
    NotActive(GameId),

    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl GameSessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameSessionError::Validation(_) => ErrorKind::Validation,
            GameSessionError::NotFound(_) => ErrorKind::NotFound,
            GameSessionError::NotJoinable(_)
            | GameSessionError::AlreadyInGame(_)
            | GameSessionError::NotYourTurn(_)
            | GameSessionError::NotActive(_) => ErrorKind::StateConflict,
            GameSessionError::IllegalMove(_) => ErrorKind::RuleViolation,
            GameSessionError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Invalid input value (bad id, bad square).
    pub fn validation(error: DomainError) -> Self {
        GameSessionError::Validation(error.to_string())
    }

    /// Map a rejected state transition of `game_id` attempted by `player`.
    pub(crate) fn from_domain(error: DomainError, game_id: GameId, player: &UserId) -> Self {
        match error {
            DomainError::NotJoinable => GameSessionError::NotJoinable(game_id),
            DomainError::AlreadyInGame => GameSessionError::AlreadyInGame(player.clone()),
            DomainError::NotActive => GameSessionError::NotActive(game_id),
            DomainError::NotYourTurn => GameSessionError::NotYourTurn(player.clone()),
            other => GameSessionError::Validation(other.to_string()),
        }
    }
}

impl From<RepositoryError> for GameSessionError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::GameNotFound(game_id) => GameSessionError::NotFound(game_id),
            other => GameSessionError::Persistence(other.to_string()),
        }
    }
}

impl From<CacheError> for GameSessionError {
    fn from(error: CacheError) -> Self {
        GameSessionError::Persistence(error.to_string())
    }
}
