//! Direct broadcast: named in-process channels shared by every session of one
//! origin.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tabmesh_proto::{RoomId, WireMessage};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{Inbound, InboundSender, Transport, TransportKind};
use crate::error::TransportError;

/// One message on a named channel, tagged with the subscriber that sent it.
#[derive(Debug, Clone)]
pub struct DirectFrame {
    pub origin: Uuid,
    pub message: Arc<WireMessage>,
}

#[derive(Debug)]
struct HubInner {
    enabled: bool,
    channels: Mutex<HashMap<String, broadcast::Sender<DirectFrame>>>,
}

/// Registry of named broadcast channels.
///
/// Cloning yields another handle to the same hub.
#[derive(Debug, Clone)]
pub struct ChannelHub {
    inner: Arc<HubInner>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// A hub that refuses every subscription.
    pub fn disabled() -> Self {
        Self::with_enabled(false)
    }

    fn with_enabled(enabled: bool) -> Self {
        Self {
            inner: Arc::new(HubInner {
                enabled,
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to `name`, creating the channel if nobody listens on it.
    pub fn subscribe(
        &self,
        name: &str,
        capacity: usize,
    ) -> Result<(broadcast::Sender<DirectFrame>, broadcast::Receiver<DirectFrame>), TransportError>
    {
        if !self.inner.enabled {
            return Err(TransportError::Unavailable(TransportKind::Direct));
        }

        let mut channels = self.inner.channels.lock();
        channels.retain(|_, sender| sender.receiver_count() > 0);

        if let Some(sender) = channels.get(name) {
            return Ok((sender.clone(), sender.subscribe()));
        }

        let (sender, receiver) = broadcast::channel(capacity.max(1));
        channels.insert(name.to_string(), sender.clone());
        Ok((sender, receiver))
    }

    /// Number of live subscribers on `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.inner
            .channels
            .lock()
            .get(name)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Room adapter over a [`ChannelHub`] channel.
pub struct DirectBroadcast {
    channel: String,
    token: Uuid,
    sender: broadcast::Sender<DirectFrame>,
    forwarder: JoinHandle<()>,
}

impl DirectBroadcast {
    pub fn channel_name(room: &RoomId) -> String {
        format!("tabmesh-room-{room}")
    }

    /// Subscribe to the room channel and start forwarding frames from other
    /// subscribers into `inbound`. Must be called inside a tokio runtime.
    pub fn open(
        hub: &ChannelHub,
        room: &RoomId,
        capacity: usize,
        inbound: InboundSender,
    ) -> Result<Self, TransportError> {
        let channel = Self::channel_name(room);
        let (sender, receiver) = hub.subscribe(&channel, capacity)?;
        let token = Uuid::new_v4();

        let forwarder = tokio::spawn(forward(channel.clone(), token, receiver, inbound));
        tracing::debug!(channel = %channel, "[direct] Subscribed");

        Ok(Self {
            channel,
            token,
            sender,
            forwarder,
        })
    }
}

async fn forward(
    channel: String,
    token: Uuid,
    mut receiver: broadcast::Receiver<DirectFrame>,
    inbound: InboundSender,
) {
    loop {
        match receiver.recv().await {
            Ok(frame) => {
                if frame.origin == token {
                    continue;
                }
                let item = Inbound {
                    message: frame.message.as_ref().clone(),
                    via: TransportKind::Direct,
                };
                if inbound.send(item).is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(channel = %channel, skipped, "[direct] Receiver lagged, frames dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::trace!(channel = %channel, "[direct] Forwarder stopped");
}

impl Transport for DirectBroadcast {
    fn kind(&self) -> TransportKind {
        TransportKind::Direct
    }

    fn send(&self, message: &WireMessage) -> Result<(), TransportError> {
        let frame = DirectFrame {
            origin: self.token,
            message: Arc::new(message.clone()),
        };
        self.sender
            .send(frame)
            .map(|_| ())
            .map_err(|_| TransportError::Closed(TransportKind::Direct))
    }
}

impl Drop for DirectBroadcast {
    fn drop(&mut self) {
        self.forwarder.abort();
        tracing::debug!(channel = %self.channel, "[direct] Closed");
    }
}
