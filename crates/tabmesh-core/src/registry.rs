//! Remote peers currently believed to be in the room.
//!
//! A peer becomes known on its first join, heartbeat or player update, stays
//! known while it keeps talking, and is forgotten either when it says goodbye
//! or when [`PeerRegistry::evict_stale`] finds it silent for longer than the
//! liveness window.

use std::collections::HashMap;
use std::time::Duration;

use tabmesh_proto::{Color, PeerId};
use tokio::time::Instant;

use crate::event::PlayerSummary;

/// Last-known info about a remote peer.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayerInfo {
    pub id: PeerId,
    pub name: String,
    pub color: Color,
    /// Time of the last accepted message from this peer.
    pub last_seen: Instant,
}

impl RemotePlayerInfo {
    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            color: self.color,
        }
    }
}

#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, RemotePlayerInfo>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a join or heartbeat: refreshes liveness and identity.
    /// Returns `true` if the peer was previously unknown.
    pub fn announce(&mut self, id: &PeerId, name: &str, color: Color, now: Instant) -> bool {
        if let Some(peer) = self.peers.get_mut(id) {
            peer.name = name.to_string();
            peer.color = color;
            peer.last_seen = now;
            return false;
        }
        self.insert(id, name, color, now);
        true
    }

    /// Record a player update: refreshes liveness only, but introduces an
    /// unknown peer under the name/color carried by its state.
    /// Returns `true` if the peer was previously unknown.
    pub fn observe_update(&mut self, id: &PeerId, name: &str, color: Color, now: Instant) -> bool {
        if self.touch(id, now) {
            return false;
        }
        self.insert(id, name, color, now);
        true
    }

    /// Refresh liveness of a known peer. Returns `false` if the peer is unknown.
    pub fn touch(&mut self, id: &PeerId, now: Instant) -> bool {
        match self.peers.get_mut(id) {
            Some(peer) => {
                peer.last_seen = now;
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, id: &PeerId, name: &str, color: Color, now: Instant) {
        self.peers.insert(
            id.clone(),
            RemotePlayerInfo {
                id: id.clone(),
                name: name.to_string(),
                color,
                last_seen: now,
            },
        );
    }

    pub fn remove(&mut self, id: &PeerId) -> Option<RemotePlayerInfo> {
        self.peers.remove(id)
    }

    /// Remove every peer silent for longer than `window` and return them.
    pub fn evict_stale(&mut self, now: Instant, window: Duration) -> Vec<RemotePlayerInfo> {
        let stale: Vec<PeerId> = self
            .peers
            .values()
            .filter(|peer| now.saturating_duration_since(peer.last_seen) > window)
            .map(|peer| peer.id.clone())
            .collect();

        stale
            .iter()
            .filter_map(|id| self.peers.remove(id))
            .collect()
    }

    pub fn get(&self, id: &PeerId) -> Option<&RemotePlayerInfo> {
        self.peers.get(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    /// Player list sorted by name, then id.
    pub fn summaries(&self) -> Vec<PlayerSummary> {
        let mut list: Vec<PlayerSummary> = self.peers.values().map(RemotePlayerInfo::summary).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        list
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}
