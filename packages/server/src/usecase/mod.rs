//! UseCase layer: the Game Session Service.

mod error;
mod game_locks;
mod game_session;

pub use error::{ErrorKind, GameSessionError};
pub use game_locks::{GameLockGuard, GameLocks};
pub use game_session::{GameSessionConfig, GameSessionService};
