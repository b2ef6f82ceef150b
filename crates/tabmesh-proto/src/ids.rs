//! Peer and message identifiers.
//!
//! Both are opaque strings on the wire. A [`PeerId`] names one session for its
//! whole lifetime; a [`MessageId`] names one send and only matters to the
//! deduplicator.

use std::fmt;

use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};

/// Length of the random component of a peer id.
const PEER_RANDOM_LEN: usize = 9;

/// Length of the random suffix of a message id.
const MESSAGE_RANDOM_LEN: usize = 6;

/// Identity of one session in a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Generate a fresh id: `p-<random>-<creation millis in base 36>`.
    pub fn generate() -> Self {
        let random = random_lowercase(PEER_RANDOM_LEN);
        Self(format!("p-{random}-{}", to_base36(now_millis())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-send token used only for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate an id for a message sent by `sender`:
    /// `<sender>-<millis in base 36>-<random>`.
    pub fn generate(sender: &PeerId) -> Self {
        let random = random_lowercase(MESSAGE_RANDOM_LEN);
        Self(format!("{sender}-{}-{random}", to_base36(now_millis())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn random_lowercase(len: usize) -> String {
    Alphanumeric
        .sample_string(&mut rand::rng(), len)
        .to_ascii_lowercase()
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while value > 0 {
        #[allow(clippy::cast_possible_truncation)]
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}
