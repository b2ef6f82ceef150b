//! Store relay: messages carried as short-lived records in a [`MemoryStore`].
//!
//! Each send writes `tabmesh:<ROOM>:<msgId>` and removes it again after the
//! record TTL. Other clients pick the record up from the write notification;
//! the removal notification is ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tabmesh_proto::{PeerId, RoomId, WireMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::store::{MemoryStore, StorageEvent, StoreClient};
use super::{Inbound, InboundSender, Transport, TransportKind};
use crate::error::TransportError;

/// Value of a relay record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRecord {
    pub sender_id: PeerId,
    pub payload: WireMessage,
}

pub struct StoreRelay {
    prefix: String,
    client: StoreClient,
    ttl: Duration,
    forwarder: JoinHandle<()>,
}

impl StoreRelay {
    /// Key prefix shared by every record of `room`.
    pub fn record_prefix(room: &RoomId) -> String {
        format!("tabmesh:{room}:")
    }

    /// Connect to `store` and start forwarding records of `room` into
    /// `inbound`. Must be called inside a tokio runtime.
    pub fn open(
        store: &MemoryStore,
        room: &RoomId,
        ttl: Duration,
        inbound: InboundSender,
    ) -> Result<Self, TransportError> {
        let (client, events) = store.connect()?;
        let prefix = Self::record_prefix(room);

        let forwarder = tokio::spawn(forward(prefix.clone(), events, inbound));
        tracing::debug!(prefix = %prefix, client = %client.id(), "[relay] Connected");

        Ok(Self {
            prefix,
            client,
            ttl,
            forwarder,
        })
    }
}

async fn forward(
    prefix: String,
    mut events: mpsc::UnboundedReceiver<StorageEvent>,
    inbound: InboundSender,
) {
    while let Some(event) = events.recv().await {
        let Some(value) = event.new_value else {
            continue;
        };
        if !event.key.starts_with(&prefix) {
            continue;
        }

        match serde_json::from_str::<RelayRecord>(&value) {
            Ok(record) => {
                let item = Inbound {
                    message: record.payload,
                    via: TransportKind::StoreRelay,
                };
                if inbound.send(item).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(key = %event.key, error = %e, "[relay] Dropping malformed record");
            }
        }
    }
    tracing::trace!(prefix = %prefix, "[relay] Forwarder stopped");
}

impl Transport for StoreRelay {
    fn kind(&self) -> TransportKind {
        TransportKind::StoreRelay
    }

    fn send(&self, message: &WireMessage) -> Result<(), TransportError> {
        let key = format!("{}{}", self.prefix, message.message_id);
        let record = RelayRecord {
            sender_id: message.message.sender().clone(),
            payload: message.clone(),
        };
        let value = serde_json::to_string(&record)?;
        self.client.set_item(&key, &value)?;

        let store = self.client.store().clone();
        let origin = self.client.id();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            store.remove(origin, &key);
        });
        Ok(())
    }
}

impl Drop for StoreRelay {
    fn drop(&mut self) {
        self.forwarder.abort();
        tracing::debug!(prefix = %self.prefix, "[relay] Closed");
    }
}
