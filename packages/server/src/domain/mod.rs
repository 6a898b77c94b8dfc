//! Domain layer: value objects, entities, game state machine and the
//! collaborator interfaces the session service depends on.

pub mod entity;
pub mod error;
pub mod repository;
pub mod rule_engine;
pub mod value_object;

pub use entity::{
    GameEvent, GameEventType, GameOutcome, GameSession, GameStatus, GameView, MoveRecord,
    PlayerProfile, STARTING_POSITION, Side,
};
pub use error::{CacheError, DomainError, RepositoryError};
pub use repository::{GameCache, GameRepository};
pub use rule_engine::{MoveOutcome, MoveValidation, RuleEngine};
pub use value_object::{ArenaId, ClientId, GameId, RoomName, Square, Timestamp, UserId};

#[cfg(test)]
pub use rule_engine::MockRuleEngine;
