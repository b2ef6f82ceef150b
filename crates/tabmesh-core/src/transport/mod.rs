//! Best-effort broadcast transports.
//!
//! Each adapter delivers a [`WireMessage`] to every other session subscribed
//! to the same room and pushes what it receives into one shared inbound
//! channel. Delivery is at-most-once per adapter and unordered; with both
//! adapters open a message typically arrives twice.

use std::fmt;

use tabmesh_proto::WireMessage;
use tokio::sync::mpsc;

use crate::error::TransportError;

pub mod direct;
pub mod relay;
pub mod store;

pub use direct::{ChannelHub, DirectBroadcast};
pub use relay::StoreRelay;
pub use store::{MemoryStore, StorageEvent, StoreClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Named broadcast channel on a [`ChannelHub`].
    Direct,
    /// Records written to a shared [`MemoryStore`].
    StoreRelay,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Direct => f.write_str("direct"),
            TransportKind::StoreRelay => f.write_str("store-relay"),
        }
    }
}

/// A message received by one of the adapters.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub message: WireMessage,
    pub via: TransportKind,
}

pub type InboundSender = mpsc::UnboundedSender<Inbound>;

/// Outbound half of an adapter. The inbound half is a forwarder task that
/// lives as long as the adapter value.
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    fn send(&self, message: &WireMessage) -> Result<(), TransportError>;
}
