//! Shared key-value store with change notifications.
//!
//! Models storage that is visible to every session of one origin: a write by
//! one client is announced to every *other* connected client as a
//! [`StorageEvent`], never to the writer itself.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::TransportKind;
use crate::error::TransportError;

/// Mutation notification. `new_value` is `None` for removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
    /// Client that performed the mutation.
    pub origin: Uuid,
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, String>,
    used: usize,
    watchers: Vec<(Uuid, mpsc::UnboundedSender<StorageEvent>)>,
}

impl StoreState {
    fn notify(&mut self, event: &StorageEvent) {
        self.watchers.retain(|(id, watcher)| {
            *id == event.origin || watcher.send(event.clone()).is_ok()
        });
    }
}

#[derive(Debug)]
struct StoreInner {
    enabled: bool,
    quota: Option<usize>,
    state: Mutex<StoreState>,
}

/// In-memory shared store.
///
/// Cloning yields another handle to the same store. Usage is measured as the
/// sum of key and value lengths in bytes.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::build(true, None)
    }

    /// A store that refuses every connection.
    pub fn disabled() -> Self {
        Self::build(false, None)
    }

    /// A store that rejects writes once `bytes` would be exceeded.
    pub fn with_quota(bytes: usize) -> Self {
        Self::build(true, Some(bytes))
    }

    fn build(enabled: bool, quota: Option<usize>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                enabled,
                quota,
                state: Mutex::new(StoreState::default()),
            }),
        }
    }

    /// Connect a new client and return it with its notification stream.
    pub fn connect(
        &self,
    ) -> Result<(StoreClient, mpsc::UnboundedReceiver<StorageEvent>), TransportError> {
        if !self.inner.enabled {
            return Err(TransportError::Unavailable(TransportKind::StoreRelay));
        }
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.state.lock().watchers.push((id, sender));

        let client = StoreClient {
            id,
            store: self.clone(),
        };
        Ok((client, receiver))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.state.lock().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().entries.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.inner.state.lock().used
    }

    pub(crate) fn write(&self, origin: Uuid, key: &str, value: &str) -> Result<(), TransportError> {
        let mut state = self.inner.state.lock();

        let previous = state
            .entries
            .get(key)
            .map_or(0, |old| key.len() + old.len());
        let requested = key.len() + value.len();
        if let Some(quota) = self.inner.quota {
            let used = state.used - previous;
            if used + requested > quota {
                return Err(TransportError::QuotaExceeded {
                    used,
                    requested,
                    quota,
                });
            }
        }

        state.used = state.used - previous + requested;
        state.entries.insert(key.to_string(), value.to_string());
        state.notify(&StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
            origin,
        });
        Ok(())
    }

    pub(crate) fn remove(&self, origin: Uuid, key: &str) {
        let mut state = self.inner.state.lock();
        let Some(old) = state.entries.remove(key) else {
            return;
        };
        state.used -= key.len() + old.len();
        state.notify(&StorageEvent {
            key: key.to_string(),
            new_value: None,
            origin,
        });
    }

    fn disconnect(&self, id: Uuid) {
        self.inner.state.lock().watchers.retain(|(watcher, _)| *watcher != id);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A connected client of a [`MemoryStore`].
#[derive(Debug)]
pub struct StoreClient {
    id: Uuid,
    store: MemoryStore,
}

impl StoreClient {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), TransportError> {
        self.store.write(self.id, key, value)
    }

    pub fn remove_item(&self, key: &str) {
        self.store.remove(self.id, key);
    }
}

impl Drop for StoreClient {
    fn drop(&mut self) {
        self.store.disconnect(self.id);
    }
}
