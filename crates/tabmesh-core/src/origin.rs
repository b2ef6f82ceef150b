//! Shared facilities visible to every session on one machine.

use tabmesh_proto::RoomId;

use crate::config::SyncConfig;
use crate::transport::{ChannelHub, DirectBroadcast, InboundSender, MemoryStore, StoreRelay, Transport};

/// The broadcast hub and shared store that co-located sessions rendezvous on.
///
/// Sessions joined through clones of one `Origin` can see each other;
/// sessions of different origins cannot.
#[derive(Debug, Clone, Default)]
pub struct Origin {
    pub hub: ChannelHub,
    pub store: MemoryStore,
}

impl Origin {
    pub fn new() -> Self {
        Self::default()
    }

    /// No direct broadcast; sessions fall back to the store relay.
    pub fn without_direct() -> Self {
        Self {
            hub: ChannelHub::disabled(),
            store: MemoryStore::new(),
        }
    }

    /// No shared store; sessions use direct broadcast only.
    pub fn without_store() -> Self {
        Self {
            hub: ChannelHub::new(),
            store: MemoryStore::disabled(),
        }
    }

    /// Neither facility is available.
    pub fn isolated() -> Self {
        Self {
            hub: ChannelHub::disabled(),
            store: MemoryStore::disabled(),
        }
    }

    /// Open every adapter this origin supports for `room`.
    ///
    /// Adapters that fail to open are logged and skipped, so the result may be
    /// empty.
    pub fn open_transports(
        &self,
        room: &RoomId,
        config: &SyncConfig,
        inbound: &InboundSender,
    ) -> Vec<Box<dyn Transport>> {
        let mut transports: Vec<Box<dyn Transport>> = Vec::with_capacity(2);

        match DirectBroadcast::open(&self.hub, room, config.direct_channel_capacity, inbound.clone()) {
            Ok(direct) => transports.push(Box::new(direct)),
            Err(e) => tracing::warn!(room = %room, error = %e, "[session] Direct broadcast unavailable"),
        }

        match StoreRelay::open(&self.store, room, config.relay_record_ttl(), inbound.clone()) {
            Ok(relay) => transports.push(Box::new(relay)),
            Err(e) => tracing::warn!(room = %room, error = %e, "[session] Store relay unavailable"),
        }

        transports
    }
}
