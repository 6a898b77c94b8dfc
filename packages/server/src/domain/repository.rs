//! Repository / Cache trait 定義
//!
//! ドメイン層が必要とする永続化・キャッシュのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## 整合性の前提
//!
//! - 変更は必ず `GameRepository` にコミットしてから `GameCache` を上書きする
//! - `commit_move` は棋譜の追加とセッションの更新を 1 つの単位で反映する

use std::time::Duration;

use async_trait::async_trait;

use super::{
    ArenaId, CacheError, GameId, GameSession, MoveRecord, PlayerProfile, RepositoryError, UserId,
};

/// 永続ストア（対局セッションと棋譜）
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// 新しい対局を保存
    async fn create_game(&self, session: &GameSession) -> Result<(), RepositoryError>;

    /// 対局を取得（存在しなければ `None`）
    async fn get_game(&self, game_id: &GameId) -> Result<Option<GameSession>, RepositoryError>;

    /// 対局を上書き保存
    async fn update_game(&self, session: &GameSession) -> Result<(), RepositoryError>;

    /// 棋譜の追加とセッション更新をアトミックに反映
    ///
    /// 保存済みの `move_count` が `expected_move_count` と異なる場合は
    /// `RepositoryError::Conflict` を返し、何も変更しない。
    async fn commit_move(
        &self,
        record: &MoveRecord,
        session: &GameSession,
        expected_move_count: u32,
    ) -> Result<(), RepositoryError>;

    /// アリーナ内の waiting / active な対局一覧（作成順）
    async fn list_active_games(
        &self,
        arena_id: &ArenaId,
    ) -> Result<Vec<GameSession>, RepositoryError>;

    /// 対局の棋譜（手数順）
    async fn list_moves(&self, game_id: &GameId) -> Result<Vec<MoveRecord>, RepositoryError>;

    /// 表示用プレイヤー情報
    async fn get_player(&self, user_id: &UserId) -> Result<Option<PlayerProfile>, RepositoryError>;
}

/// TTL 付きの Key-Value キャッシュと Pub/Sub
#[async_trait]
pub trait GameCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// チャンネルにメッセージを発行（購読者がいなくてもエラーにしない）
    async fn publish(&self, channel: &str, payload: String) -> Result<(), CacheError>;
}
