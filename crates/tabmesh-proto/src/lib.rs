//! Tabmesh Protocol
//!
//! Message vocabulary shared by every session in a room: peer and message
//! identifiers, player state, the six protocol message kinds, and the room-id
//! helpers used to build shareable links.
//!
//! Everything here is plain data with a JSON wire form. Transports and the
//! session logic live in `tabmesh-core`.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod color;
pub mod ids;
pub mod message;
pub mod player;
pub mod room;

pub use color::Color;
pub use ids::{MessageId, PeerId};
pub use message::{Message, MessageKind, WireMessage};
pub use player::{Facing, PlayerState};
pub use room::{RoomId, RoomIdError, parse_room_link, room_link};
