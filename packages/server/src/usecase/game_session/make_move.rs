//! MakeMove: 手番のプレイヤーの着手を検証して反映する
//!
//! 1. 対局ロックを取得
//! 2. キャッシュ優先で対局を読み込み（なければストア）
//! 3. 対局中か・手番か・ルール上合法かを確認
//! 4. 読み込み時の手数を条件に棋譜とセッションをコミット
//! 5. キャッシュを上書きし、`move_made` / `game_finished` を発行
//!
//! キャッシュの内容がストアより古かった場合（コミット競合、または古い状態に
//! 基づく拒否）はキャッシュを捨て、ストアの状態から 1 回だけやり直す。

use serde::Serialize;

use super::{GameSessionService, ReadSource};
use crate::{
    domain::{
        GameEventType, GameId, GameSession, MoveRecord, MoveValidation, RepositoryError, Square,
        UserId,
    },
    usecase::{ErrorKind, GameSessionError},
};

/// Data of `move_made` and `game_finished` events.
#[derive(Serialize)]
struct MovePayload<'a> {
    #[serde(rename = "move")]
    record: &'a MoveRecord,
    game: &'a GameSession,
}

enum Attempt {
    Committed(GameSession, MoveRecord),
    /// The store moved on since the snapshot was read.
    Stale,
}

impl GameSessionService {
    pub async fn make_move(
        &self,
        game_id: GameId,
        player: UserId,
        from: Square,
        to: Square,
    ) -> Result<MoveRecord, GameSessionError> {
        let _guard = self.locks.acquire(game_id).await;

        let (snapshot, source) = self.load_cached_or_stored(game_id).await?;
        let (session, record) = match self.attempt_move(&snapshot, &player, &from, &to).await {
            Ok(Attempt::Committed(session, record)) => (session, record),
            Ok(Attempt::Stale) => {
                tracing::warn!(
                    "Game '{}' changed after move {} was read, retrying from store",
                    game_id,
                    snapshot.move_count
                );
                self.invalidate(game_id).await;
                let stored = self.load_from_store(game_id).await?;
                self.commit_from_store(&stored, &player, &from, &to).await?
            }
            Err(rejection)
                if source == ReadSource::Cache && rejection.kind() != ErrorKind::Persistence =>
            {
                let stored = self.load_from_store(game_id).await?;
                if stored == snapshot {
                    return Err(rejection);
                }
                tracing::warn!(
                    "Cached state of game '{}' was stale ({}), retrying from store",
                    game_id,
                    rejection
                );
                self.invalidate(game_id).await;
                self.commit_from_store(&stored, &player, &from, &to).await?
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "Game '{}' move {}: {} by '{}'",
            game_id,
            record.move_number,
            record.notation,
            player
        );

        let finished = session.is_finished();
        if finished {
            tracing::info!("Game '{}' finished: {:?}", game_id, session.result);
        }

        self.refresh_cache(&session).await?;
        let event_type = if finished {
            GameEventType::GameFinished
        } else {
            GameEventType::MoveMade
        };
        let payload = MovePayload {
            record: &record,
            game: &session,
        };
        self.publish_event(&session, event_type, &payload).await;

        Ok(record)
    }

    /// Second and final attempt, made against the store's current state.
    async fn commit_from_store(
        &self,
        stored: &GameSession,
        player: &UserId,
        from: &Square,
        to: &Square,
    ) -> Result<(GameSession, MoveRecord), GameSessionError> {
        match self.attempt_move(stored, player, from, to).await? {
            Attempt::Committed(session, record) => Ok((session, record)),
            Attempt::Stale => Err(GameSessionError::Persistence(format!(
                "game '{}' changed concurrently, move was not recorded",
                stored.id
            ))),
        }
    }

    async fn attempt_move(
        &self,
        snapshot: &GameSession,
        player: &UserId,
        from: &Square,
        to: &Square,
    ) -> Result<Attempt, GameSessionError> {
        let game_id = snapshot.id;
        snapshot
            .ensure_turn(player)
            .map_err(|e| GameSessionError::from_domain(e, game_id, player))?;

        let outcome = match self
            .rule_engine
            .validate_move(&snapshot.position, from, to)
        {
            MoveValidation::Legal(outcome) => outcome,
            MoveValidation::Illegal { reason } => {
                tracing::debug!(
                    "Rejected move {}-{} in game '{}': {}",
                    from,
                    to,
                    game_id,
                    reason
                );
                return Err(GameSessionError::IllegalMove(reason));
            }
        };

        let expected_move_count = snapshot.move_count;
        let mut session = snapshot.clone();
        let record = session
            .apply_move(player, from.clone(), to.clone(), outcome, self.now())
            .map_err(|e| GameSessionError::from_domain(e, game_id, player))?;

        match self
            .repository
            .commit_move(&record, &session, expected_move_count)
            .await
        {
            Ok(()) => Ok(Attempt::Committed(session, record)),
            Err(RepositoryError::Conflict { .. } | RepositoryError::DuplicateMove { .. }) => {
                Ok(Attempt::Stale)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::{
        ConflictOnceRepository, Fixture, FlakyCache, arena, build_service, sq, user,
    };
    use crate::{
        domain::{
            GameCache, GameEvent, GameEventType, GameId, GameOutcome, GameRepository, GameSession,
            GameStatus, MockRuleEngine, MoveOutcome, MoveValidation, Side,
        },
        infrastructure::{cache::InMemoryGameCache, rule_engine::ChessRuleEngine},
        usecase::{ErrorKind, GameSessionError},
    };

    #[tokio::test]
    async fn test_first_move_is_recorded() {
        // テスト項目: 白番の合法手が棋譜とセッションに反映される
        // given (前提条件):
        let fixture = Fixture::new();
        let session = fixture.start_game().await;

        // when (操作):
        let record = fixture
            .service
            .make_move(session.id, user("alice"), sq("e2"), sq("e4"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(record.move_number, 1);
        assert_eq!(record.side, Side::White);
        assert_eq!(record.player_id, user("alice"));
        assert_eq!(record.piece, "pawn");
        assert_eq!(record.notation, "e2-e4");
        assert_eq!(record.time_remaining, 600);

        let stored = fixture.repository.get_game(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.move_count, 1);
        assert_eq!(stored.current_turn, Side::Black);
        assert_eq!(stored.position, record.position_after);
        let moves = fixture.repository.list_moves(&session.id).await.unwrap();
        assert_eq!(moves, vec![record]);

        let cached = fixture.cache.get(&session.id.channel()).await.unwrap().unwrap();
        let cached: GameSession = serde_json::from_str(&cached).unwrap();
        assert_eq!(cached, stored);
    }

    #[tokio::test]
    async fn test_create_join_move_scenario() {
        // テスト項目: 作成 → 参加 → 着手 → 不正な着手、の一連の流れ
        // given (前提条件):
        let fixture = Fixture::new();
        let created = fixture
            .service
            .create_game(arena("A"), user("u1"))
            .await
            .unwrap();
        assert_eq!(created.status, GameStatus::Waiting);
        assert_eq!(created.white, Some(user("u1")));

        let joined = fixture
            .service
            .join_game(created.id, user("u2"))
            .await
            .unwrap();
        assert_eq!(joined.status, GameStatus::Active);
        assert_eq!(joined.black, Some(user("u2")));
        assert_eq!(joined.current_turn, Side::White);

        fixture
            .service
            .make_move(created.id, user("u1"), sq("e2"), sq("e4"))
            .await
            .unwrap();
        let after_first = fixture.repository.get_game(&created.id).await.unwrap().unwrap();
        assert_eq!(after_first.move_count, 1);
        assert_eq!(after_first.current_turn, Side::Black);

        // when (操作): 黒番が空になった e2 から指そうとする
        let result = fixture
            .service
            .make_move(created.id, user("u2"), sq("e2"), sq("e4"))
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().kind(), ErrorKind::RuleViolation);
        let unchanged = fixture.repository.get_game(&created.id).await.unwrap().unwrap();
        assert_eq!(unchanged, after_first);
    }

    #[tokio::test]
    async fn test_move_out_of_turn_is_rejected() {
        // テスト項目: 手番でないプレイヤーや観戦者の着手は NotYourTurn
        // given (前提条件):
        let fixture = Fixture::new();
        let session = fixture.start_game().await;

        // when (操作):
        let black_first = fixture
            .service
            .make_move(session.id, user("bob"), sq("e7"), sq("e5"))
            .await;
        let outsider = fixture
            .service
            .make_move(session.id, user("carol"), sq("e2"), sq("e4"))
            .await;

        // then (期待する結果):
        assert_eq!(black_first, Err(GameSessionError::NotYourTurn(user("bob"))));
        assert_eq!(outsider, Err(GameSessionError::NotYourTurn(user("carol"))));
        let stored = fixture.repository.get_game(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.move_count, 0);
    }

    #[tokio::test]
    async fn test_move_in_waiting_game_is_rejected() {
        // テスト項目: 開始前の対局への着手は NotActive
        // given (前提条件):
        let fixture = Fixture::new();
        let session = fixture
            .service
            .create_game(arena("arena1"), user("alice"))
            .await
            .unwrap();

        // when (操作):
        let result = fixture
            .service
            .make_move(session.id, user("alice"), sq("e2"), sq("e4"))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(GameSessionError::NotActive(session.id)));
    }

    #[tokio::test]
    async fn test_illegal_move_changes_nothing() {
        // テスト項目: ルール上不正な着手は IllegalMove となり、状態は変わらない
        // given (前提条件):
        let fixture = Fixture::new();
        let session = fixture.start_game().await;

        // when (操作):
        let result = fixture
            .service
            .make_move(session.id, user("alice"), sq("e2"), sq("e5"))
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().kind(), ErrorKind::RuleViolation);
        let stored = fixture.repository.get_game(&session.id).await.unwrap().unwrap();
        assert_eq!(stored, session);
        assert!(fixture.repository.list_moves(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_game_is_not_found() {
        // テスト項目: 存在しない対局への着手は NotFound
        // given (前提条件):
        let fixture = Fixture::new();
        let game_id = GameId::generate();

        // when (操作):
        let result = fixture
            .service
            .make_move(game_id, user("alice"), sq("e2"), sq("e4"))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(GameSessionError::NotFound(game_id)));
    }

    #[tokio::test]
    async fn test_checkmate_finishes_game() {
        // テスト項目: 詰みで対局が終了し、ロックが解放され game_finished が発行される
        // given (前提条件): fool's mate の手順
        let fixture = Fixture::new();
        let session = fixture.start_game().await;
        let mut events = fixture.cache.subscribe();
        let moves = [
            ("alice", "f2", "f3"),
            ("bob", "e7", "e5"),
            ("alice", "g2", "g4"),
        ];
        for (player, from, to) in moves {
            fixture
                .service
                .make_move(session.id, user(player), sq(from), sq(to))
                .await
                .unwrap();
        }

        // when (操作):
        let record = fixture
            .service
            .make_move(session.id, user("bob"), sq("d8"), sq("h4"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(record.is_checkmate);
        let stored = fixture.repository.get_game(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, GameStatus::Finished);
        assert_eq!(stored.result, Some(GameOutcome::BlackWins));
        assert_eq!(stored.finished_at.map(|t| t.value()), Some(fixture.now));
        assert_eq!(fixture.service.tracked_locks(), 0);

        let mut last = None;
        while let Ok(publication) = events.try_recv() {
            last = Some(publication);
        }
        let event: GameEvent = serde_json::from_str(&last.unwrap().payload).unwrap();
        assert_eq!(event.event_type, GameEventType::GameFinished);
        assert_eq!(event.data["move"]["move_number"], 4);
        assert_eq!(event.data["game"]["status"], "finished");

        let after = fixture
            .service
            .make_move(session.id, user("alice"), sq("a2"), sq("a3"))
            .await;
        assert_eq!(after, Err(GameSessionError::NotActive(session.id)));
        assert_eq!(fixture.service.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_stalemate_finishes_game_as_draw() {
        // テスト項目: ルールエンジンがステイルメイトと判定したら引き分けで終局する
        // given (前提条件):
        let mut engine = MockRuleEngine::new();
        engine
            .expect_validate_move()
            .times(1)
            .returning(|_, _, _| {
                MoveValidation::Legal(MoveOutcome {
                    piece: "queen".to_string(),
                    captured: false,
                    promotion: None,
                    is_check: false,
                    is_checkmate: false,
                    is_stalemate: true,
                    notation: "Qg1-g6".to_string(),
                    position: "7k/5K2/6Q1/8/8/8/8/8 b - - 1 1".to_string(),
                })
            });
        let fixture = Fixture::with_engine(engine);
        let session = fixture.start_game().await;

        // when (操作):
        let record = fixture
            .service
            .make_move(session.id, user("alice"), sq("g1"), sq("g6"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(record.is_stalemate);
        let stored = fixture.repository.get_game(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, GameStatus::Finished);
        assert_eq!(stored.result, Some(GameOutcome::Draw));
        assert_eq!(stored.position, "7k/5K2/6Q1/8/8/8/8/8 b - - 1 1");
    }

    #[tokio::test]
    async fn test_stale_cache_falls_back_to_store() {
        // テスト項目: キャッシュが古くてもストアの状態から着手が成立する
        // given (前提条件): 白の着手後、キャッシュを着手前の状態に戻す
        let fixture = Fixture::new();
        let before = fixture.start_game().await;
        fixture
            .service
            .make_move(before.id, user("alice"), sq("e2"), sq("e4"))
            .await
            .unwrap();
        fixture
            .cache
            .set(
                &before.id.channel(),
                serde_json::to_string(&before).unwrap(),
                std::time::Duration::from_secs(60),
            )
            .await
            .unwrap();

        // when (操作):
        let record = fixture
            .service
            .make_move(before.id, user("bob"), sq("e7"), sq("e5"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(record.move_number, 2);
        let stored = fixture.repository.get_game(&before.id).await.unwrap().unwrap();
        assert_eq!(stored.move_count, 2);
        assert_eq!(stored.current_turn, Side::White);
    }

    #[tokio::test]
    async fn test_commit_conflict_is_retried_once() {
        // テスト項目: コミット競合が起きたらストアから読み直して 1 回だけやり直す
        // given (前提条件):
        let repository = Arc::new(ConflictOnceRepository::new());
        let service = build_service(
            repository.clone(),
            Arc::new(InMemoryGameCache::new()),
            Arc::new(ChessRuleEngine::new()),
        );
        let session = service
            .create_game(arena("arena1"), user("alice"))
            .await
            .unwrap();
        service.join_game(session.id, user("bob")).await.unwrap();

        // when (操作):
        let record = service
            .make_move(session.id, user("alice"), sq("d2"), sq("d4"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(repository.has_conflicted());
        assert_eq!(record.move_number, 1);
        let moves = repository.list_moves(&session.id).await.unwrap();
        assert_eq!(moves.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_moves_apply_once() {
        // テスト項目: 同じ着手が同時に送られても 1 回しか反映されない
        // given (前提条件):
        let fixture = Fixture::new();
        let session = fixture.start_game().await;

        // when (操作):
        let (first, second) = tokio::join!(
            fixture
                .service
                .make_move(session.id, user("alice"), sq("e2"), sq("e4")),
            fixture
                .service
                .make_move(session.id, user("alice"), sq("e2"), sq("e4")),
        );

        // then (期待する結果):
        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let rejected = if first.is_ok() { second } else { first };
        assert_eq!(rejected, Err(GameSessionError::NotYourTurn(user("alice"))));
        let stored = fixture.repository.get_game(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.move_count, 1);
    }

    #[tokio::test]
    async fn test_cache_read_failure_uses_store() {
        // テスト項目: キャッシュが読めなくてもストアから読み込んで着手できる
        // given (前提条件):
        let fixture = Fixture::with_cache(FlakyCache::new());
        let session = fixture.start_game().await;
        fixture.cache.fail_reads();

        // when (操作):
        let result = fixture
            .service
            .make_move(session.id, user("alice"), sq("e2"), sq("e4"))
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_surfaced_after_commit() {
        // テスト項目: キャッシュ更新に失敗すると Persistence エラーになるが、ストアには反映済み
        // given (前提条件):
        let fixture = Fixture::with_cache(FlakyCache::new());
        let session = fixture.start_game().await;
        fixture.cache.fail_writes();

        // when (操作):
        let result = fixture
            .service
            .make_move(session.id, user("alice"), sq("e2"), sq("e4"))
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Persistence);
        let stored = fixture.repository.get_game(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.move_count, 1);

        // 古いキャッシュが残っていても次の着手はストアの状態で判定される
        let next = fixture
            .service
            .make_move(session.id, user("bob"), sq("e7"), sq("e5"))
            .await;
        assert_eq!(next.unwrap_err().kind(), ErrorKind::Persistence);
        let stored = fixture.repository.get_game(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.move_count, 2);
    }
}
