//! Room identifiers and shareable room links.
//!
//! A room id is a short uppercase code. New ids are drawn from an alphabet
//! without the visually ambiguous `0 O 1 I L`, so they can be read aloud or
//! typed from a screenshot. Links carry the id in the `room` query parameter.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

/// Characters used by [`RoomId::generate`].
pub const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Length of a generated room id.
pub const ROOM_ID_LEN: usize = 6;

/// Longest room id accepted by [`RoomId::parse`].
pub const ROOM_ID_MAX_LEN: usize = 32;

/// Query parameter that carries the room id in a link.
pub const ROOM_QUERY_PARAM: &str = "room";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomIdError {
    #[error("Room id is empty")]
    Empty,

    #[error("Room id is longer than 32 characters")]
    TooLong,

    #[error("Room id contains invalid character '{0}'")]
    InvalidChar(char),
}

/// Logical namespace scoping all transports and messages of one game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Random id of [`ROOM_ID_LEN`] characters from [`ROOM_ID_ALPHABET`].
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..ROOM_ID_LEN)
            .map(|_| char::from(ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())]))
            .collect();
        Self(id)
    }

    /// Normalize user input: trims whitespace and uppercases.
    /// Accepts any ASCII alphanumerics, not only the generation alphabet.
    pub fn parse(input: &str) -> Result<Self, RoomIdError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RoomIdError::Empty);
        }
        if trimmed.len() > ROOM_ID_MAX_LEN {
            return Err(RoomIdError::TooLong);
        }
        if let Some(bad) = trimmed.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(RoomIdError::InvalidChar(bad));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = RoomIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RoomId::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a shareable link to `room` on top of `base`.
///
/// Other query parameters of `base` are kept; an existing `room` parameter is
/// replaced.
pub fn room_link(base: &Url, room: &RoomId) -> Url {
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != ROOM_QUERY_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut link = base.clone();
    link.set_query(None);
    {
        let mut pairs = link.query_pairs_mut();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        pairs.append_pair(ROOM_QUERY_PARAM, room.as_str());
    }
    link
}

/// Extract a room id from a link.
///
/// Accepts absolute URLs, relative locators such as `?room=ABCDEF`, and bare
/// room ids.
pub fn parse_room_link(input: &str) -> Option<RoomId> {
    let input = input.trim();
    let from_query = Url::parse("http://localhost/")
        .and_then(|base| base.join(input))
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == ROOM_QUERY_PARAM)
                .map(|(_, value)| value.into_owned())
        });

    match from_query {
        Some(raw) => RoomId::parse(&raw).ok(),
        None => RoomId::parse(input).ok(),
    }
}
