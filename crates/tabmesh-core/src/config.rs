//! Protocol timing and sizing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables of a room session.
///
/// Every field has a default, so a partial TOML/JSON document deserializes
/// into a complete config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Period of own heartbeat broadcasts.
    pub heartbeat_interval_ms: u64,
    /// Period of the stale-peer scan.
    pub liveness_scan_interval_ms: u64,
    /// Silence after which a peer is evicted.
    pub liveness_window_ms: u64,
    /// Delays after construction at which the join announcement is repeated.
    pub join_announce_delays_ms: Vec<u64>,
    /// Delay before answering a join from a previously unknown peer.
    pub join_reply_delay_ms: u64,
    /// Lifetime of a record written to the shared store.
    pub relay_record_ttl_ms: u64,
    /// Dedup set size that triggers a trim.
    pub dedup_high_water: usize,
    /// Dedup set size after a trim.
    pub dedup_low_water: usize,
    /// Buffer of the direct broadcast channel, per room.
    pub direct_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 400,
            liveness_scan_interval_ms: 2000,
            liveness_window_ms: 3000,
            join_announce_delays_ms: vec![200, 600, 1200, 2500],
            join_reply_delay_ms: 50,
            relay_record_ttl_ms: 600,
            dedup_high_water: 200,
            dedup_low_water: 100,
            direct_channel_capacity: 256,
        }
    }
}

impl SyncConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    pub fn liveness_scan_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_scan_interval_ms.max(1))
    }

    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.liveness_window_ms)
    }

    pub fn join_announce_delays(&self) -> impl Iterator<Item = Duration> + '_ {
        self.join_announce_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
    }

    pub fn join_reply_delay(&self) -> Duration {
        Duration::from_millis(self.join_reply_delay_ms)
    }

    pub fn relay_record_ttl(&self) -> Duration {
        Duration::from_millis(self.relay_record_ttl_ms)
    }
}
