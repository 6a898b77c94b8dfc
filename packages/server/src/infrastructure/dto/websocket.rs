//! WebSocket message envelope.
//!
//! Wire shape: `{"type": ..., "data": ..., "room"?: ..., "user_id"?: ..., "username"?: ...}`.
//! `data` is decoded into a closed set of payload variants selected by `type`,
//! so dispatch can match exhaustively. Payload structs keep unknown fields in
//! `extra` so that forwarded messages go out exactly as the client sent them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::domain::{ClientId, GameEvent, UserId};

/// Envelope `type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    JoinRoom,
    LeaveRoom,
    ChatMessage,
    GameMove,
    AvatarPosition,
    AvatarAnimation,
    ConnectionEstablished,
    /// Server-originated game notification; never accepted from clients.
    GameUpdate,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::JoinRoom => "join_room",
            MessageType::LeaveRoom => "leave_room",
            MessageType::ChatMessage => "chat_message",
            MessageType::GameMove => "game_move",
            MessageType::AvatarPosition => "avatar_position",
            MessageType::AvatarAnimation => "avatar_animation",
            MessageType::ConnectionEstablished => "connection_established",
            MessageType::GameUpdate => "game_update",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value {
            "join_room" => MessageType::JoinRoom,
            "leave_room" => MessageType::LeaveRoom,
            "chat_message" => MessageType::ChatMessage,
            "game_move" => MessageType::GameMove,
            "avatar_position" => MessageType::AvatarPosition,
            "avatar_animation" => MessageType::AvatarAnimation,
            "connection_established" => MessageType::ConnectionEstablished,
            "game_update" => MessageType::GameUpdate,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomRequest {
    /// Alternative to the envelope-level `room` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageData {
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMoveData {
    pub from: String,
    pub to: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Coordinates stay as JSON numbers so integers are not re-encoded as floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarPositionData {
    pub x: Number,
    pub y: Number,
    pub z: Number,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarAnimationData {
    pub animation: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEstablishedData {
    pub client_id: String,
    pub status: String,
}

/// Typed `data` of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    JoinRoom(RoomRequest),
    LeaveRoom(RoomRequest),
    ChatMessage(ChatMessageData),
    GameMove(GameMoveData),
    AvatarPosition(AvatarPositionData),
    AvatarAnimation(AvatarAnimationData),
    ConnectionEstablished(ConnectionEstablishedData),
    GameUpdate(GameEvent),
}

impl Payload {
    pub fn kind(&self) -> MessageType {
        match self {
            Payload::JoinRoom(_) => MessageType::JoinRoom,
            Payload::LeaveRoom(_) => MessageType::LeaveRoom,
            Payload::ChatMessage(_) => MessageType::ChatMessage,
            Payload::GameMove(_) => MessageType::GameMove,
            Payload::AvatarPosition(_) => MessageType::AvatarPosition,
            Payload::AvatarAnimation(_) => MessageType::AvatarAnimation,
            Payload::ConnectionEstablished(_) => MessageType::ConnectionEstablished,
            Payload::GameUpdate(_) => MessageType::GameUpdate,
        }
    }

    fn decode(kind: MessageType, data: Value) -> Result<Self, serde_json::Error> {
        // An absent `data` decodes like an empty object.
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let payload = match kind {
            MessageType::JoinRoom => Payload::JoinRoom(serde_json::from_value(data)?),
            MessageType::LeaveRoom => Payload::LeaveRoom(serde_json::from_value(data)?),
            MessageType::ChatMessage => Payload::ChatMessage(serde_json::from_value(data)?),
            MessageType::GameMove => Payload::GameMove(serde_json::from_value(data)?),
            MessageType::AvatarPosition => Payload::AvatarPosition(serde_json::from_value(data)?),
            MessageType::AvatarAnimation => {
                Payload::AvatarAnimation(serde_json::from_value(data)?)
            }
            MessageType::ConnectionEstablished => {
                Payload::ConnectionEstablished(serde_json::from_value(data)?)
            }
            MessageType::GameUpdate => Payload::GameUpdate(serde_json::from_value(data)?),
        };
        Ok(payload)
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Payload::JoinRoom(data) | Payload::LeaveRoom(data) => serde_json::to_value(data),
            Payload::ChatMessage(data) => serde_json::to_value(data),
            Payload::GameMove(data) => serde_json::to_value(data),
            Payload::AvatarPosition(data) => serde_json::to_value(data),
            Payload::AvatarAnimation(data) => serde_json::to_value(data),
            Payload::ConnectionEstablished(data) => serde_json::to_value(data),
            Payload::GameUpdate(event) => serde_json::to_value(event),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("invalid data for '{kind}': {source}")]
    InvalidData {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    room: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Serialize)]
struct WireEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    room: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

/// The unit exchanged over the socket and through room broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub payload: Payload,
    pub room: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
}

impl Envelope {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            room: None,
            user_id: None,
            username: None,
        }
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Greeting sent once to every newly registered client.
    pub fn connection_established(client_id: ClientId) -> Self {
        Self::new(Payload::ConnectionEstablished(ConnectionEstablishedData {
            client_id: client_id.to_string(),
            status: "connected".to_string(),
        }))
    }

    pub fn game_update(room: impl Into<String>, event: GameEvent) -> Self {
        Self::new(Payload::GameUpdate(event)).with_room(room)
    }

    pub fn kind(&self) -> MessageType {
        self.payload.kind()
    }

    /// Room the envelope addresses; join/leave may also carry it inside `data`.
    pub fn target_room(&self) -> Option<&str> {
        let from_data = match &self.payload {
            Payload::JoinRoom(request) | Payload::LeaveRoom(request) => request.room.as_deref(),
            _ => None,
        };
        self.room.as_deref().or(from_data)
    }

    /// Overwrite the sender identity with the authenticated one.
    pub fn stamp_identity(&mut self, user_id: &UserId, username: &str) {
        self.user_id = Some(user_id.as_str().to_string());
        self.username = Some(username.to_string());
    }

    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let raw: RawEnvelope = serde_json::from_str(text)?;
        let kind =
            MessageType::parse(&raw.kind).ok_or_else(|| DecodeError::UnknownType(raw.kind))?;
        let payload = Payload::decode(kind, raw.data).map_err(|source| DecodeError::InvalidData {
            kind: kind.as_str(),
            source,
        })?;

        Ok(Self {
            payload,
            room: raw.room,
            user_id: raw.user_id,
            username: raw.username,
        })
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let wire = WireEnvelope {
            kind: self.kind().as_str(),
            data: self.payload.to_value()?,
            room: self.room.as_deref(),
            user_id: self.user_id.as_deref(),
            username: self.username.as_deref(),
        };
        serde_json::to_string(&wire)
    }
}
