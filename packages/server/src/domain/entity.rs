//! Entities
//!
//! `GameSession` はゲームの権威ある状態を表し、状態遷移
//! （waiting → active → finished）はこのモジュールのメソッドでのみ行います。
//! `MoveRecord` は着手ごとに 1 件作られる不変の記録です。

use serde::{Deserialize, Serialize};

use super::{
    error::DomainError,
    rule_engine::MoveOutcome,
    value_object::{ArenaId, GameId, Square, Timestamp, UserId},
};

/// Standard chess starting position in FEN.
pub const STARTING_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// 席（白番・黒番）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Active,
    Finished,
    /// Only reachable administratively; no session operation produces it.
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameOutcome {
    pub fn win_for(side: Side) -> Self {
        match side {
            Side::White => GameOutcome::WhiteWins,
            Side::Black => GameOutcome::BlackWins,
        }
    }
}

/// 対局セッション
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: GameId,
    pub arena_id: ArenaId,
    pub white: Option<UserId>,
    pub black: Option<UserId>,
    pub status: GameStatus,
    pub result: Option<GameOutcome>,
    pub current_turn: Side,
    /// Serialized board (FEN).
    pub position: String,
    pub move_count: u32,
    pub time_control_secs: u32,
    pub white_time_remaining: u32,
    pub black_time_remaining: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

impl GameSession {
    /// 新しい対局を作成（作成者が白番、黒番は空席）
    pub fn create(
        id: GameId,
        arena_id: ArenaId,
        creator: UserId,
        time_control_secs: u32,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            arena_id,
            white: Some(creator),
            black: None,
            status: GameStatus::Waiting,
            result: None,
            current_turn: Side::White,
            position: STARTING_POSITION.to_string(),
            move_count: 0,
            time_control_secs,
            white_time_remaining: time_control_secs,
            black_time_remaining: time_control_secs,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    /// 黒番に着席させて対局を開始する
    pub fn seat_black(&mut self, joiner: UserId, now: Timestamp) -> Result<(), DomainError> {
        if self.status != GameStatus::Waiting {
            return Err(DomainError::NotJoinable);
        }
        if self.white.as_ref() == Some(&joiner) {
            return Err(DomainError::AlreadyInGame);
        }

        self.black = Some(joiner);
        self.status = GameStatus::Active;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn holder(&self, side: Side) -> Option<&UserId> {
        match side {
            Side::White => self.white.as_ref(),
            Side::Black => self.black.as_ref(),
        }
    }

    pub fn remaining_time(&self, side: Side) -> u32 {
        match side {
            Side::White => self.white_time_remaining,
            Side::Black => self.black_time_remaining,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    /// 着手可能か確認し、手番の席を返す
    pub fn ensure_turn(&self, player: &UserId) -> Result<Side, DomainError> {
        if self.status != GameStatus::Active {
            return Err(DomainError::NotActive);
        }
        let side = self.current_turn;
        if self.holder(side) != Some(player) {
            return Err(DomainError::NotYourTurn);
        }
        Ok(side)
    }

    /// ルールエンジンが合法と判定した着手を反映し、棋譜レコードを返す
    ///
    /// 手数を 1 進め、手番を交代する。詰みなら指した側の勝ち、
    /// ステイルメイトなら引き分けで終局する。
    pub fn apply_move(
        &mut self,
        player: &UserId,
        from: Square,
        to: Square,
        outcome: MoveOutcome,
        now: Timestamp,
    ) -> Result<MoveRecord, DomainError> {
        let mover = self.ensure_turn(player)?;

        let record = MoveRecord {
            game_id: self.id,
            move_number: self.move_count + 1,
            side: mover,
            player_id: player.clone(),
            from,
            to,
            piece: outcome.piece,
            captured: outcome.captured,
            promotion: outcome.promotion,
            is_check: outcome.is_check,
            is_checkmate: outcome.is_checkmate,
            is_stalemate: outcome.is_stalemate,
            notation: outcome.notation,
            position_after: outcome.position.clone(),
            time_remaining: self.remaining_time(mover),
            created_at: now,
        };

        self.position = outcome.position;
        self.move_count = record.move_number;
        self.current_turn = mover.opponent();
        self.updated_at = now;

        if record.is_checkmate {
            self.finish(GameOutcome::win_for(mover), now);
        } else if record.is_stalemate {
            self.finish(GameOutcome::Draw, now);
        }

        Ok(record)
    }

    fn finish(&mut self, result: GameOutcome, now: Timestamp) {
        self.status = GameStatus::Finished;
        self.result = Some(result);
        self.finished_at = Some(now);
    }
}

/// 1 手分の不変な棋譜レコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub game_id: GameId,
    pub move_number: u32,
    pub side: Side,
    pub player_id: UserId,
    pub from: Square,
    pub to: Square,
    pub piece: String,
    pub captured: bool,
    pub promotion: Option<String>,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub notation: String,
    pub position_after: String,
    /// Mover's clock when the move was made, in seconds.
    pub time_remaining: u32,
    pub created_at: Timestamp,
}

/// 対局ごとのチャンネルに発行される通知の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEventType {
    PlayerJoined,
    MoveMade,
    GameFinished,
}

/// `game:{id}` チャンネルに発行される通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub game_id: GameId,
    pub event_type: GameEventType,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

/// 表示用のプレイヤー情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub user_id: UserId,
    pub username: String,
}

impl PlayerProfile {
    /// Profile for a user the store knows nothing about.
    pub fn anonymous(user_id: UserId) -> Self {
        let username = user_id.as_str().to_string();
        Self { user_id, username }
    }
}

/// 席のプレイヤー情報を解決済みの対局ビュー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    #[serde(flatten)]
    pub session: GameSession,
    pub white_player: Option<PlayerProfile>,
    pub black_player: Option<PlayerProfile>,
}
