//! JoinGame: 待機中の対局に黒番として参加し、対局を開始する
//!
//! 参加可否は常に永続ストアの状態で判定する（キャッシュは読まない）。

use super::GameSessionService;
use crate::{
    domain::{GameEventType, GameId, GameSession, UserId},
    usecase::GameSessionError,
};

impl GameSessionService {
    pub async fn join_game(
        &self,
        game_id: GameId,
        joiner: UserId,
    ) -> Result<GameSession, GameSessionError> {
        let _guard = self.locks.acquire(game_id).await;

        let mut session = self.load_from_store(game_id).await?;
        session
            .seat_black(joiner.clone(), self.now())
            .map_err(|e| GameSessionError::from_domain(e, game_id, &joiner))?;

        self.repository.update_game(&session).await?;
        self.refresh_cache(&session).await?;
        self.publish_event(&session, GameEventType::PlayerJoined, &session)
            .await;

        tracing::info!("Player '{}' joined game '{}' as black", joiner, game_id);
        Ok(session)
    }
}
