//! Value Objects
//!
//! 識別子や盤面座標など、生成時に検証される不変の値を定義します。
//! 不正な値はコンストラクタで `DomainError` として弾かれるため、
//! 以降の層では検証済みであることを前提にできます。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;

const MAX_USER_ID_LENGTH: usize = 64;
const MAX_ARENA_ID_LENGTH: usize = 64;
const MAX_ROOM_NAME_LENGTH: usize = 128;

fn validate_identifier(
    value: &str,
    max_length: usize,
    kind: &'static str,
) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::EmptyIdentifier(kind));
    }
    if value.chars().count() > max_length {
        return Err(DomainError::IdentifierTooLong {
            kind,
            max: max_length,
        });
    }
    Ok(())
}

/// 認証済みユーザーの ID（上流の認証層が発行したもの）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, DomainError> {
        validate_identifier(&value, MAX_USER_ID_LENGTH, "user id")?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 1 本の WebSocket 接続を識別する ID（接続ごとにサーバー側で採番）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ゲームセッションの ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(Uuid);

impl GameId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| DomainError::InvalidGameId(value.to_string()))
    }

    /// Cache key and publish channel share the same `game:{id}` name.
    pub fn channel(&self) -> String {
        format!("game:{}", self.0)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// アリーナ（ゲームが所属する場）の ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArenaId(String);

impl ArenaId {
    pub fn new(value: String) -> Result<Self, DomainError> {
        validate_identifier(&value, MAX_ARENA_ID_LENGTH, "arena id")?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ArenaId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ArenaId> for String {
    fn from(value: ArenaId) -> Self {
        value.0
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ブロードキャストグループ（Room）の名前
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomName(String);

impl RoomName {
    pub fn new(value: String) -> Result<Self, DomainError> {
        validate_identifier(&value, MAX_ROOM_NAME_LENGTH, "room name")?;
        Ok(Self(value))
    }

    /// Room that receives notifications for a single game.
    pub fn for_game(game_id: &GameId) -> Self {
        Self(game_id.channel())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 盤面上のマス（"a1" から "h8"）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square(String);

impl Square {
    pub fn new(value: String) -> Result<Self, DomainError> {
        let normalized = value.trim().to_ascii_lowercase();
        let mut chars = normalized.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('a'..='h'), Some('1'..='8'), None) => Ok(Self(normalized)),
            _ => Err(DomainError::InvalidSquare(value)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Square {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Square> for String {
    fn from(value: Square) -> Self {
        value.0
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix タイムスタンプ（UTC, ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_rejects_empty_value() {
        // テスト項目: 空白のみのユーザー ID は生成できない
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(DomainError::EmptyIdentifier("user id")));
    }

    #[test]
    fn test_user_id_rejects_too_long_value() {
        // テスト項目: 上限を超える長さのユーザー ID は生成できない
        // given (前提条件):
        let value = "u".repeat(MAX_USER_ID_LENGTH + 1);

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(DomainError::IdentifierTooLong { kind: "user id", .. })
        ));
    }

    #[test]
    fn test_square_accepts_board_coordinates() {
        // テスト項目: 盤面の座標は大文字・前後空白を正規化して受け付ける
        // given (前提条件):
        let inputs = ["e2", "A1", " h8 "];

        // when (操作):
        let squares: Vec<Square> = inputs
            .iter()
            .map(|s| Square::new(s.to_string()).unwrap())
            .collect();

        // then (期待する結果):
        assert_eq!(squares[0].as_str(), "e2");
        assert_eq!(squares[1].as_str(), "a1");
        assert_eq!(squares[2].as_str(), "h8");
    }

    #[test]
    fn test_square_rejects_off_board_coordinates() {
        // テスト項目: 盤外や形式不正の座標はエラーになる
        // given (前提条件):
        let inputs = ["i1", "a9", "e", "e22", ""];

        // when (操作) / then (期待する結果):
        for input in inputs {
            assert!(
                Square::new(input.to_string()).is_err(),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_game_id_channel_format() {
        // テスト項目: キャッシュキー／通知チャンネル名が game:{id} 形式になる
        // given (前提条件):
        let game_id = GameId::parse("6f1c0c5e-3c4c-4a59-9a57-2b1f3f0f8e11").unwrap();

        // when (操作):
        let channel = game_id.channel();

        // then (期待する結果):
        assert_eq!(channel, "game:6f1c0c5e-3c4c-4a59-9a57-2b1f3f0f8e11");
        assert_eq!(RoomName::for_game(&game_id).as_str(), channel);
    }

    #[test]
    fn test_game_id_parse_rejects_garbage() {
        // テスト項目: UUID でない文字列は GameId にならない
        // given (前提条件):
        let value = "not-a-uuid";

        // when (操作):
        let result = GameId::parse(value);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(DomainError::InvalidGameId("not-a-uuid".to_string()))
        );
    }

    #[test]
    fn test_user_id_deserialization_is_validated() {
        // テスト項目: JSON からのデシリアライズ時にも検証が行われる
        // given (前提条件):
        let valid = r#""alice""#;
        let invalid = r#""""#;

        // when (操作):
        let ok: Result<UserId, _> = serde_json::from_str(valid);
        let err: Result<UserId, _> = serde_json::from_str(invalid);

        // then (期待する結果):
        assert_eq!(ok.unwrap().as_str(), "alice");
        assert!(err.is_err());
    }
}
