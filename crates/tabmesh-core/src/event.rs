//! Notifications delivered to the game by a room session.

use std::fmt;

use serde::{Deserialize, Serialize};
use tabmesh_proto::{Color, Message, PeerId};

/// Public projection of a remote peer, as shown in player lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PeerId,
    pub name: String,
    pub color: Color,
}

/// Why a peer left the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DepartureReason {
    /// The peer broadcast `playerLeft`.
    Announced,
    /// The peer went silent for longer than the liveness window.
    TimedOut,
}

impl fmt::Display for DepartureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepartureReason::Announced => f.write_str("announced"),
            DepartureReason::TimedOut => f.write_str("timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A `playerUpdate`, `levelChange` or `playerLeft` from another peer.
    Message(Message),
    /// A peer started the game.
    GameStart { level: u32, host: PeerId },
    /// Number of known remote peers changed (or may have).
    ConnectionChange { count: usize },
    /// Always follows [`SyncEvent::ConnectionChange`].
    PlayerListChange { players: Vec<PlayerSummary> },
    /// Human-readable status line.
    Status(String),
    Error(String),
    PeerJoined(PlayerSummary),
    PeerLeft {
        peer_id: PeerId,
        name: String,
        reason: DepartureReason,
    },
}
