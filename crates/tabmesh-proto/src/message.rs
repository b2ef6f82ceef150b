//! Protocol messages.
//!
//! [`Message`] is the logical vocabulary: six kinds, each carrying the sender's
//! peer id. [`WireMessage`] is what actually travels over a transport: the
//! same message flattened together with a per-send [`MessageId`] that only the
//! deduplicator looks at.
//!
//! JSON shape (internally tagged, camelCase):
//!
//! ```json
//! {"type":"playerJoin","peerId":"p-k3j…","name":"Ann","color":"#ff0000","msgId":"p-k3j…-lq2…-x8a0c1"}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::ids::{MessageId, PeerId};
use crate::player::PlayerState;

/// Logical protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    /// Full state of the sender's player.
    PlayerUpdate { peer_id: PeerId, player: PlayerState },
    /// Room-wide switch to another level.
    LevelChange { peer_id: PeerId, level: u32 },
    /// Announcement of presence (initial, repeated, or as a reply).
    PlayerJoin {
        peer_id: PeerId,
        name: String,
        color: Color,
    },
    /// Graceful departure.
    PlayerLeft { peer_id: PeerId },
    /// Room-wide game start at the given level.
    StartGame { peer_id: PeerId, level: u32 },
    /// Periodic liveness signal.
    Heartbeat {
        peer_id: PeerId,
        name: String,
        color: Color,
    },
}

/// Discriminant of a [`Message`], for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    PlayerUpdate,
    LevelChange,
    PlayerJoin,
    PlayerLeft,
    StartGame,
    Heartbeat,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::PlayerUpdate => "playerUpdate",
            MessageKind::LevelChange => "levelChange",
            MessageKind::PlayerJoin => "playerJoin",
            MessageKind::PlayerLeft => "playerLeft",
            MessageKind::StartGame => "startGame",
            MessageKind::Heartbeat => "heartbeat",
        };
        f.write_str(name)
    }
}

impl Message {
    /// Peer that sent this message.
    pub fn sender(&self) -> &PeerId {
        match self {
            Message::PlayerUpdate { peer_id, .. }
            | Message::LevelChange { peer_id, .. }
            | Message::PlayerJoin { peer_id, .. }
            | Message::PlayerLeft { peer_id }
            | Message::StartGame { peer_id, .. }
            | Message::Heartbeat { peer_id, .. } => peer_id,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::PlayerUpdate { .. } => MessageKind::PlayerUpdate,
            Message::LevelChange { .. } => MessageKind::LevelChange,
            Message::PlayerJoin { .. } => MessageKind::PlayerJoin,
            Message::PlayerLeft { .. } => MessageKind::PlayerLeft,
            Message::StartGame { .. } => MessageKind::StartGame,
            Message::Heartbeat { .. } => MessageKind::Heartbeat,
        }
    }
}

/// A message as placed on a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(flatten)]
    pub message: Message,
    #[serde(rename = "msgId")]
    pub message_id: MessageId,
}

impl WireMessage {
    /// Stamp `message` with a fresh id derived from its sender.
    pub fn stamp(message: Message) -> Self {
        let message_id = MessageId::generate(message.sender());
        Self {
            message,
            message_id,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Drop the wire id, leaving the logical message.
    pub fn into_message(self) -> Message {
        self.message
    }
}
