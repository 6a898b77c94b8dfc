//! Game Session Service
//!
//! 対局の作成・参加・着手・参照を提供するユースケース。
//!
//! ## 整合性ルール
//!
//! - 変更は必ず永続ストアにコミットしてからキャッシュ（`game:{id}`）を上書きする
//! - 着手はキャッシュ優先で読み込み、ストアの `move_count` で楽観的に検証する
//!   （食い違ったらキャッシュを捨ててストアから 1 回だけやり直す）
//! - 同じ対局への変更は `GameLocks` で直列化する
//! - 変更ごとに `GameEvent` を `game:{id}` チャンネルへ発行する

mod create_game;
mod join_game;
mod make_move;
mod queries;

#[cfg(test)]
mod test_support;

use std::{sync::Arc, time::Duration};

use rookery_shared::time::Clock;
use serde::Serialize;

use super::{GameLocks, GameSessionError};
use crate::domain::{
    GameCache, GameEvent, GameEventType, GameId, GameRepository, GameSession, RuleEngine,
    Timestamp,
};

/// Game Session Service の設定
#[derive(Debug, Clone)]
pub struct GameSessionConfig {
    /// キャッシュエントリの有効期限
    pub cache_ttl: Duration,
    /// 新規対局の持ち時間（秒）
    pub default_time_control_secs: u32,
}

impl Default for GameSessionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            default_time_control_secs: 600,
        }
    }
}

/// Where a session snapshot was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadSource {
    Cache,
    Store,
}

pub struct GameSessionService {
    repository: Arc<dyn GameRepository>,
    cache: Arc<dyn GameCache>,
    rule_engine: Arc<dyn RuleEngine>,
    clock: Arc<dyn Clock>,
    locks: GameLocks,
    config: GameSessionConfig,
}

impl GameSessionService {
    pub fn new(
        repository: Arc<dyn GameRepository>,
        cache: Arc<dyn GameCache>,
        rule_engine: Arc<dyn RuleEngine>,
        clock: Arc<dyn Clock>,
        config: GameSessionConfig,
    ) -> Self {
        Self {
            repository,
            cache,
            rule_engine,
            clock,
            locks: GameLocks::new(),
            config,
        }
    }

    /// Number of games that currently own a lock entry.
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// 永続ストアから対局を読み込む（キャッシュは見ない）
    async fn load_from_store(&self, game_id: GameId) -> Result<GameSession, GameSessionError> {
        self.repository
            .get_game(&game_id)
            .await?
            .ok_or(GameSessionError::NotFound(game_id))
    }

    /// キャッシュを優先して対局を読み込み、なければストアから読む
    ///
    /// キャッシュの読み出し失敗や壊れたエントリはストアへのフォールバックで吸収する。
    async fn load_cached_or_stored(
        &self,
        game_id: GameId,
    ) -> Result<(GameSession, ReadSource), GameSessionError> {
        let key = game_id.channel();
        match self.cache.get(&key).await {
            Ok(Some(json)) => match serde_json::from_str::<GameSession>(&json) {
                Ok(session) => return Ok((session, ReadSource::Cache)),
                Err(e) => {
                    tracing::warn!("Discarding undecodable cache entry '{}': {}", key, e);
                    self.invalidate(game_id).await;
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Cache read for '{}' failed, using store: {}", key, e);
            }
        }
        let session = self.load_from_store(game_id).await?;
        Ok((session, ReadSource::Store))
    }

    /// コミット済みの状態でキャッシュを上書きする
    ///
    /// 書き込みに失敗した場合は古いエントリを残さないよう削除を試みてからエラーを返す。
    async fn refresh_cache(&self, session: &GameSession) -> Result<(), GameSessionError> {
        let key = session.id.channel();
        let result = match serde_json::to_string(session) {
            Ok(json) => self.cache.set(&key, json, self.config.cache_ttl).await,
            Err(e) => Err(crate::domain::CacheError::Encode {
                key: key.clone(),
                reason: e.to_string(),
            }),
        };
        if let Err(e) = result {
            tracing::error!("Failed to refresh cache entry '{}': {}", key, e);
            self.invalidate(session.id).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn invalidate(&self, game_id: GameId) {
        let key = game_id.channel();
        if let Err(e) = self.cache.delete(&key).await {
            tracing::warn!("Failed to invalidate cache entry '{}': {}", key, e);
        }
    }

    /// `game:{id}` チャンネルに対局イベントを発行する
    ///
    /// 発行はベストエフォート。失敗してもコミット済みの変更は取り消さない。
    async fn publish_event<T>(&self, session: &GameSession, event_type: GameEventType, data: &T)
    where
        T: Serialize + Sync + ?Sized,
    {
        let channel = session.id.channel();
        let event = match serde_json::to_value(data) {
            Ok(data) => GameEvent {
                game_id: session.id,
                event_type,
                data,
                timestamp: self.now(),
            },
            Err(e) => {
                tracing::warn!("Failed to encode game event for '{}': {}", channel, e);
                return;
            }
        };
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to encode game event for '{}': {}", channel, e);
                return;
            }
        };
        if let Err(e) = self.cache.publish(&channel, payload).await {
            tracing::warn!("Failed to publish game event on '{}': {}", channel, e);
        }
    }
}
