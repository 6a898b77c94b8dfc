//! Domain layer errors.

use thiserror::Error;

use super::value_object::GameId;

/// Invalid values and illegal state-machine transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),

    #[error("{kind} must be at most {max} characters")]
    IdentifierTooLong { kind: &'static str, max: usize },

    #[error("invalid game id '{0}'")]
    InvalidGameId(String),

    #[error("invalid square '{0}'")]
    InvalidSquare(String),

    /// The game is not waiting for an opponent.
    #[error("game is not waiting for an opponent")]
    NotJoinable,

    /// The joining player already holds the white seat.
    #[error("player already holds a seat in this game")]
    AlreadyInGame,

    /// Moves are only accepted while the game is active.
    #[error("game is not active")]
    NotActive,

    /// The player does not hold the seat whose turn it is.
    #[error("it is not this player's turn")]
    NotYourTurn,
}

/// Durable store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("game '{0}' not found")]
    GameNotFound(GameId),

    /// The stored move count differs from the one the caller read.
    #[error("game '{game_id}' changed concurrently (expected move {expected}, found {actual})")]
    Conflict {
        game_id: GameId,
        expected: u32,
        actual: u32,
    },

    #[error("move {move_number} of game '{game_id}' already recorded")]
    DuplicateMove { game_id: GameId, move_number: u32 },

    #[error("game '{0}' already exists")]
    DuplicateGame(GameId),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Cache failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache entry '{key}' could not be encoded: {reason}")]
    Encode { key: String, reason: String },

    #[error("cache backend failure: {0}")]
    Backend(String),
}
