//! CreateGame: 新しい対局を作成し、作成者を白番に着席させる

use super::GameSessionService;
use crate::{
    domain::{ArenaId, GameId, GameSession, UserId},
    usecase::GameSessionError,
};

impl GameSessionService {
    pub async fn create_game(
        &self,
        arena_id: ArenaId,
        creator: UserId,
    ) -> Result<GameSession, GameSessionError> {
        let session = GameSession::create(
            GameId::generate(),
            arena_id,
            creator,
            self.config.default_time_control_secs,
            self.now(),
        );

        self.repository.create_game(&session).await?;
        self.refresh_cache(&session).await?;

        tracing::info!(
            "Game '{}' created in arena '{}' by '{}'",
            session.id,
            session.arena_id,
            session.white.as_ref().map(|u| u.as_str()).unwrap_or_default()
        );
        Ok(session)
    }
}
