//! 参照系: GetActiveGames / GetGame / ListMoves

use super::GameSessionService;
use crate::{
    domain::{ArenaId, GameId, GameSession, GameView, MoveRecord, PlayerProfile, UserId},
    usecase::GameSessionError,
};

impl GameSessionService {
    /// アリーナ内の waiting / active な対局を作成順に返す
    pub async fn get_active_games(
        &self,
        arena_id: &ArenaId,
    ) -> Result<Vec<GameView>, GameSessionError> {
        let sessions = self.repository.list_active_games(arena_id).await?;
        let mut views = Vec::with_capacity(sessions.len());
        for session in sessions {
            views.push(self.to_view(session).await?);
        }
        Ok(views)
    }

    /// 対局を 1 件返す（キャッシュ優先）
    pub async fn get_game(&self, game_id: GameId) -> Result<GameView, GameSessionError> {
        let (session, _) = self.load_cached_or_stored(game_id).await?;
        self.to_view(session).await
    }

    /// 対局の棋譜を手数順に返す
    pub async fn list_moves(&self, game_id: GameId) -> Result<Vec<MoveRecord>, GameSessionError> {
        self.load_from_store(game_id).await?;
        Ok(self.repository.list_moves(&game_id).await?)
    }

    async fn to_view(&self, session: GameSession) -> Result<GameView, GameSessionError> {
        let white_player = self.resolve_player(session.white.as_ref()).await?;
        let black_player = self.resolve_player(session.black.as_ref()).await?;
        Ok(GameView {
            session,
            white_player,
            black_player,
        })
    }

    /// Display profile for a seat holder; users unknown to the store show their id.
    async fn resolve_player(
        &self,
        user_id: Option<&UserId>,
    ) -> Result<Option<PlayerProfile>, GameSessionError> {
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        let profile = self
            .repository
            .get_player(user_id)
            .await?
            .unwrap_or_else(|| PlayerProfile::anonymous(user_id.clone()));
        Ok(Some(profile))
    }
}
