//! Shared fixtures for the Game Session Service tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use rookery_shared::time::FixedClock;

use super::{GameSessionConfig, GameSessionService};
use crate::{
    domain::{
        ArenaId, CacheError, GameCache, GameId, GameRepository, GameSession, MoveRecord,
        PlayerProfile, RepositoryError, RuleEngine, Square, UserId,
    },
    infrastructure::{
        cache::InMemoryGameCache, repository::InMemoryGameRepository, rule_engine::ChessRuleEngine,
    },
};

pub const NOW: i64 = 1_700_000_000_000;

pub fn user(value: &str) -> UserId {
    UserId::new(value.to_string()).unwrap()
}

pub fn arena(value: &str) -> ArenaId {
    ArenaId::new(value.to_string()).unwrap()
}

pub fn sq(value: &str) -> Square {
    Square::new(value.to_string()).unwrap()
}

pub fn build_service(
    repository: Arc<dyn GameRepository>,
    cache: Arc<dyn GameCache>,
    rule_engine: Arc<dyn RuleEngine>,
) -> GameSessionService {
    GameSessionService::new(
        repository,
        cache,
        rule_engine,
        Arc::new(FixedClock::new(NOW)),
        GameSessionConfig::default(),
    )
}

pub struct Fixture<C = InMemoryGameCache> {
    pub service: GameSessionService,
    pub repository: Arc<InMemoryGameRepository>,
    pub cache: Arc<C>,
    pub now: i64,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_cache(InMemoryGameCache::new())
    }

    pub fn with_engine(rule_engine: impl RuleEngine + 'static) -> Self {
        let repository = Arc::new(InMemoryGameRepository::new());
        let cache = Arc::new(InMemoryGameCache::new());
        let service = build_service(repository.clone(), cache.clone(), Arc::new(rule_engine));
        Self {
            service,
            repository,
            cache,
            now: NOW,
        }
    }
}

impl<C: GameCache + 'static> Fixture<C> {
    pub fn with_cache(cache: C) -> Self {
        let repository = Arc::new(InMemoryGameRepository::new());
        let cache = Arc::new(cache);
        let service = build_service(
            repository.clone(),
            cache.clone(),
            Arc::new(ChessRuleEngine::new()),
        );
        Self {
            service,
            repository,
            cache,
            now: NOW,
        }
    }

    /// alice (white) vs bob (black), ready for the first move.
    pub async fn start_game(&self) -> GameSession {
        let session = self
            .service
            .create_game(arena("arena1"), user("alice"))
            .await
            .unwrap();
        self.service
            .join_game(session.id, user("bob"))
            .await
            .unwrap()
    }
}

/// In-memory cache whose reads or writes can be switched to failing.
pub struct FlakyCache {
    inner: InMemoryGameCache,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyCache {
    pub fn new() -> Self {
        Self {
            inner: InMemoryGameCache::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn unavailable() -> CacheError {
        CacheError::Backend("connection refused".to_string())
    }
}

#[async_trait]
impl GameCache for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.delete(key).await
    }

    async fn publish(&self, channel: &str, payload: String) -> Result<(), CacheError> {
        self.inner.publish(channel, payload).await
    }
}

/// Repository that rejects the first move commit as if another writer got there first.
pub struct ConflictOnceRepository {
    inner: InMemoryGameRepository,
    conflicted: AtomicBool,
}

impl ConflictOnceRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryGameRepository::new(),
            conflicted: AtomicBool::new(false),
        }
    }

    pub fn has_conflicted(&self) -> bool {
        self.conflicted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GameRepository for ConflictOnceRepository {
    async fn create_game(&self, session: &GameSession) -> Result<(), RepositoryError> {
        self.inner.create_game(session).await
    }

    async fn get_game(&self, game_id: &GameId) -> Result<Option<GameSession>, RepositoryError> {
        self.inner.get_game(game_id).await
    }

    async fn update_game(&self, session: &GameSession) -> Result<(), RepositoryError> {
        self.inner.update_game(session).await
    }

    async fn commit_move(
        &self,
        record: &MoveRecord,
        session: &GameSession,
        expected_move_count: u32,
    ) -> Result<(), RepositoryError> {
        if !self.conflicted.swap(true, Ordering::SeqCst) {
            return Err(RepositoryError::Conflict {
                game_id: session.id,
                expected: expected_move_count,
                actual: expected_move_count + 1,
            });
        }
        self.inner
            .commit_move(record, session, expected_move_count)
            .await
    }

    async fn list_active_games(
        &self,
        arena_id: &ArenaId,
    ) -> Result<Vec<GameSession>, RepositoryError> {
        self.inner.list_active_games(arena_id).await
    }

    async fn list_moves(&self, game_id: &GameId) -> Result<Vec<MoveRecord>, RepositoryError> {
        self.inner.list_moves(game_id).await
    }

    async fn get_player(&self, user_id: &UserId) -> Result<Option<PlayerProfile>, RepositoryError> {
        self.inner.get_player(user_id).await
    }
}
