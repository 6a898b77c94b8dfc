//! InMemory Game Repository 実装
//!
//! ドメイン層が定義する `GameRepository` trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! セッション・棋譜・プレイヤー情報を 1 つの RwLock で保護しているため、
//! `commit_move` の棋譜追加とセッション更新は同じ書き込みロックの中で
//! まとめて反映されます（片方だけが残ることはありません）。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    ArenaId, GameId, GameRepository, GameSession, GameStatus, MoveRecord, PlayerProfile,
    RepositoryError, UserId,
};

#[derive(Default)]
struct Store {
    games: HashMap<GameId, GameSession>,
    moves: HashMap<GameId, Vec<MoveRecord>>,
    players: HashMap<UserId, PlayerProfile>,
}

/// インメモリ Game Repository 実装
#[derive(Default)]
pub struct InMemoryGameRepository {
    store: RwLock<Store>,
}

impl InMemoryGameRepository {
    /// 新しい InMemoryGameRepository を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 表示用のプレイヤー情報を登録（既存なら上書き）
    pub async fn upsert_player(&self, profile: PlayerProfile) {
        let mut store = self.store.write().await;
        store.players.insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn create_game(&self, session: &GameSession) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        if store.games.contains_key(&session.id) {
            return Err(RepositoryError::DuplicateGame(session.id));
        }
        store.games.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_game(&self, game_id: &GameId) -> Result<Option<GameSession>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.games.get(game_id).cloned())
    }

    async fn update_game(&self, session: &GameSession) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        let stored = store
            .games
            .get_mut(&session.id)
            .ok_or(RepositoryError::GameNotFound(session.id))?;
        *stored = session.clone();
        Ok(())
    }

    async fn commit_move(
        &self,
        record: &MoveRecord,
        session: &GameSession,
        expected_move_count: u32,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;

        // 検証をすべて終えてから書き込む
        let actual = store
            .games
            .get(&session.id)
            .map(|game| game.move_count)
            .ok_or(RepositoryError::GameNotFound(session.id))?;
        if actual != expected_move_count {
            return Err(RepositoryError::Conflict {
                game_id: session.id,
                expected: expected_move_count,
                actual,
            });
        }
        let already_recorded = store
            .moves
            .get(&record.game_id)
            .is_some_and(|moves| moves.iter().any(|m| m.move_number == record.move_number));
        if already_recorded {
            return Err(RepositoryError::DuplicateMove {
                game_id: record.game_id,
                move_number: record.move_number,
            });
        }

        store
            .moves
            .entry(record.game_id)
            .or_default()
            .push(record.clone());
        store.games.insert(session.id, session.clone());
        Ok(())
    }

    async fn list_active_games(
        &self,
        arena_id: &ArenaId,
    ) -> Result<Vec<GameSession>, RepositoryError> {
        let store = self.store.read().await;
        let mut games: Vec<GameSession> = store
            .games
            .values()
            .filter(|game| &game.arena_id == arena_id)
            .filter(|game| matches!(game.status, GameStatus::Waiting | GameStatus::Active))
            .cloned()
            .collect();
        games.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(games)
    }

    async fn list_moves(&self, game_id: &GameId) -> Result<Vec<MoveRecord>, RepositoryError> {
        let store = self.store.read().await;
        let mut moves = store.moves.get(game_id).cloned().unwrap_or_default();
        moves.sort_by_key(|m| m.move_number);
        Ok(moves)
    }

    async fn get_player(&self, user_id: &UserId) -> Result<Option<PlayerProfile>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.players.get(user_id).cloned())
    }
}
