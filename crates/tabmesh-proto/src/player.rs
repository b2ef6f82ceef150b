//! Per-player state broadcast in `playerUpdate` messages.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Horizontal facing of a player sprite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Kinematic, cosmetic and status fields of one player.
///
/// Each peer is the only writer of its own state; receivers apply updates as
/// last-write-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub facing: Facing,
    pub on_ground: bool,
    pub name: String,
    pub color: Color,
    /// Level the player is currently on.
    pub level: u32,
    /// Whether the player reached the exit of the current level.
    pub finished: bool,
    pub deaths: u32,
}

impl PlayerState {
    /// A player standing at the origin of level 0.
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            facing: Facing::default(),
            on_ground: true,
            name: name.into(),
            color,
            level: 0,
            finished: false,
            deaths: 0,
        }
    }

    #[must_use]
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }
}
