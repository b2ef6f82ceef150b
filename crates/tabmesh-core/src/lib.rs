//! Tabmesh Core Library
//!
//! Serverless room membership for co-located game sessions. Every session
//! opens two best-effort broadcast transports scoped to its room, announces
//! itself repeatedly, heartbeats, evicts silent peers, and deduplicates the
//! double delivery that the redundant transports produce.
//!
//! Entry point is [`RoomSync::join`], which spawns the session actor and
//! returns a handle plus a stream of [`SyncEvent`]s.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dedup;
pub mod error;
pub mod event;
pub mod origin;
pub mod registry;
pub mod session;
pub mod transport;

pub use config::SyncConfig;
pub use dedup::MessageDeduplicator;
pub use error::{SyncError, TransportError};
pub use event::{DepartureReason, PlayerSummary, SyncEvent};
pub use origin::Origin;
pub use registry::{PeerRegistry, RemotePlayerInfo};
pub use session::{JoinParams, RoomSync};
pub use transport::{ChannelHub, Inbound, MemoryStore, Transport, TransportKind};

pub use tabmesh_proto as proto;
