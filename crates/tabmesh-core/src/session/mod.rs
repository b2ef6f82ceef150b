//! Room session: the [`RoomSync`] handle and the actor behind it.
//!
//! [`RoomSync::join`] opens the origin's transports, spawns a
//! [`RoomSession`] task that owns all protocol state, and returns a cheap
//! handle plus the event stream. Handle calls are forwarded to the task as
//! [`Command`]s; nothing is shared between the two besides channels.

mod state;
#[cfg(test)]
mod tests;

use tabmesh_proto::{Color, Message, PeerId, PlayerState, RoomId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::event::{PlayerSummary, SyncEvent};
use crate::origin::Origin;

pub use state::RoomSession;

/// Who joins which room.
#[derive(Debug, Clone)]
pub struct JoinParams {
    pub room_id: RoomId,
    pub name: String,
    pub color: Color,
    /// Informational: only changes the startup status line.
    pub is_host: bool,
}

impl JoinParams {
    pub fn new(room_id: RoomId, name: impl Into<String>) -> Self {
        Self {
            room_id,
            name: name.into(),
            color: Color::default(),
            is_host: false,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn as_host(mut self) -> Self {
        self.is_host = true;
        self
    }
}

#[derive(Debug)]
pub(crate) enum Command {
    Broadcast(Message),
    Players(oneshot::Sender<Vec<PlayerSummary>>),
    ConnectionCount(oneshot::Sender<usize>),
    Destroy(oneshot::Sender<()>),
}

/// Handle to a running room session.
///
/// Dropping the handle ends the session the same way [`RoomSync::destroy`]
/// does, without waiting for it.
#[derive(Debug)]
pub struct RoomSync {
    peer_id: PeerId,
    room_id: RoomId,
    is_host: bool,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl RoomSync {
    /// Join `params.room_id` on `origin`. Must be called inside a tokio
    /// runtime.
    ///
    /// The event receiver is unbounded and receives every `playerUpdate` of
    /// every peer: keep draining it, or drop it if the events are not wanted.
    pub fn join(
        origin: &Origin,
        params: JoinParams,
        config: SyncConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let peer_id = PeerId::generate();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let transports = origin.open_transports(&params.room_id, &config, &inbound_tx);
        drop(inbound_tx);

        let room_id = params.room_id.clone();
        let is_host = params.is_host;
        let session = RoomSession::new(peer_id.clone(), params, config, transports, events_tx);
        let task = tokio::spawn(session.run(commands_rx, inbound_rx));

        let handle = Self {
            peer_id,
            room_id,
            is_host,
            commands: commands_tx,
            task,
        };
        (handle, events_rx)
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn send_player_update(&self, player: PlayerState) -> Result<(), SyncError> {
        self.broadcast(Message::PlayerUpdate {
            peer_id: self.peer_id.clone(),
            player,
        })
    }

    pub fn send_level_change(&self, level: u32) -> Result<(), SyncError> {
        self.broadcast(Message::LevelChange {
            peer_id: self.peer_id.clone(),
            level,
        })
    }

    pub fn start_game(&self, level: u32) -> Result<(), SyncError> {
        self.broadcast(Message::StartGame {
            peer_id: self.peer_id.clone(),
            level,
        })
    }

    fn broadcast(&self, message: Message) -> Result<(), SyncError> {
        self.commands
            .send(Command::Broadcast(message))
            .map_err(|_| SyncError::SessionClosed)
    }

    /// Remote peers currently in the room, sorted by name.
    pub async fn players(&self) -> Result<Vec<PlayerSummary>, SyncError> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(Command::Players(reply))
            .map_err(|_| SyncError::SessionClosed)?;
        answer.await.map_err(|_| SyncError::SessionClosed)
    }

    pub async fn connection_count(&self) -> Result<usize, SyncError> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(Command::ConnectionCount(reply))
            .map_err(|_| SyncError::SessionClosed)?;
        answer.await.map_err(|_| SyncError::SessionClosed)
    }

    /// Broadcast `playerLeft`, close the transports and wait for the session
    /// task to finish.
    pub async fn destroy(self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Destroy(reply)).is_ok() {
            let _ = done.await;
        }
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                tracing::error!(error = %e, "[session] Session task failed");
            }
        }
    }

    /// Kill the session task without saying goodbye, as a crashed tab would.
    #[cfg(test)]
    pub(crate) fn abort(&self) {
        self.task.abort();
    }
}
