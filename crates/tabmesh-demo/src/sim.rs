//! Simulated players driving several sessions of one room.

use std::f32::consts::TAU;
use std::time::Duration;

use tabmesh_core::proto::{Color, Facing, Message, PlayerState, RoomId};
use tabmesh_core::{JoinParams, Origin, RoomSync, SyncConfig, SyncEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};

const NAMES: [&str; 8] = ["Ann", "Bob", "Cleo", "Dax", "Eve", "Finn", "Gus", "Hana"];

const UPDATE_INTERVAL: Duration = Duration::from_millis(100);
const GAME_START_AFTER: Duration = Duration::from_secs(1);
const ORBIT_RADIUS: f32 = 120.0;
const ORBIT_CENTER: (f32, f32) = (400.0, 300.0);
/// Radians per second.
const ORBIT_SPEED: f32 = 1.2;

#[derive(Debug, Clone)]
pub struct Scenario {
    pub room: RoomId,
    pub peers: usize,
    pub duration: Duration,
    pub sync: SyncConfig,
}

struct SimPlayer {
    name: String,
    session: Option<RoomSync>,
    state: PlayerState,
    phase: f32,
    logger: JoinHandle<()>,
}

impl SimPlayer {
    fn join(origin: &Origin, scenario: &Scenario, index: usize) -> Self {
        let name = match NAMES.get(index) {
            Some(name) => (*name).to_string(),
            None => format!("Player{}", index + 1),
        };
        let color = Color::for_index(index);

        let mut params = JoinParams::new(scenario.room.clone(), name.clone()).with_color(color);
        if index == 0 {
            params = params.as_host();
        }
        let (session, events) = RoomSync::join(origin, params, scenario.sync.clone());
        let logger = tokio::spawn(log_events(name.clone(), events));

        #[allow(clippy::cast_precision_loss)]
        let phase = TAU * index as f32 / scenario.peers.max(1) as f32;

        Self {
            state: PlayerState::new(name.clone(), color),
            name,
            session: Some(session),
            phase,
            logger,
        }
    }

    /// Move along a circle around the level center.
    fn advance(&mut self, elapsed: Duration) {
        let angle = self.phase + elapsed.as_secs_f32() * ORBIT_SPEED;
        let (sin, cos) = angle.sin_cos();
        self.state.x = ORBIT_CENTER.0 + ORBIT_RADIUS * cos;
        self.state.y = ORBIT_CENTER.1 + ORBIT_RADIUS * sin;
        self.state.vx = -ORBIT_RADIUS * ORBIT_SPEED * sin;
        self.state.vy = ORBIT_RADIUS * ORBIT_SPEED * cos;
        self.state.facing = if self.state.vx < 0.0 {
            Facing::Left
        } else {
            Facing::Right
        };
    }
}

async fn log_events(name: String, mut events: mpsc::UnboundedReceiver<SyncEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::Message(Message::PlayerUpdate { peer_id, player }) => {
                tracing::trace!(player = %name, from = %peer_id, x = player.x, y = player.y, "[demo] Update");
            }
            SyncEvent::Message(message) => {
                tracing::info!(player = %name, kind = %message.kind(), from = %message.sender(), "[demo] Message");
            }
            SyncEvent::GameStart { level, host } => {
                tracing::info!(player = %name, level, host = %host, "[demo] Game start");
            }
            SyncEvent::ConnectionChange { count } => {
                tracing::info!(player = %name, count, "[demo] Connections");
            }
            SyncEvent::PlayerListChange { players } => {
                let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
                tracing::debug!(player = %name, players = ?names, "[demo] Player list");
            }
            SyncEvent::Status(text) => {
                tracing::info!(player = %name, "[demo] {text}");
            }
            SyncEvent::Error(text) => {
                tracing::error!(player = %name, "[demo] {text}");
            }
            SyncEvent::PeerJoined(_) | SyncEvent::PeerLeft { .. } => {}
        }
    }
}

/// Run `scenario` to completion and destroy every session.
pub async fn run(origin: &Origin, scenario: &Scenario) -> anyhow::Result<()> {
    let mut players: Vec<SimPlayer> = (0..scenario.peers)
        .map(|index| SimPlayer::join(origin, scenario, index))
        .collect();

    let start = Instant::now();
    let mut ticker = interval(UPDATE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut game_started = false;
    let mut level_changed = false;
    let mut departed = players.len() < 2;

    while start.elapsed() < scenario.duration {
        ticker.tick().await;
        let elapsed = start.elapsed();

        for player in &mut players {
            player.advance(elapsed);
            if let Some(session) = &player.session {
                session.send_player_update(player.state.clone())?;
            }
        }

        let Some(host) = players.first().and_then(|p| p.session.as_ref()) else {
            break;
        };
        if !game_started && elapsed >= GAME_START_AFTER {
            host.start_game(1)?;
            game_started = true;
        }
        if !level_changed && elapsed >= scenario.duration / 2 {
            host.send_level_change(2)?;
            for player in &mut players {
                player.state.level = 2;
            }
            level_changed = true;
        }
        if !departed && elapsed >= scenario.duration * 3 / 5 {
            if let Some(leaving) = players.last_mut() {
                if let Some(session) = leaving.session.take() {
                    tracing::info!(player = %leaving.name, "[demo] Leaving early");
                    session.destroy().await;
                }
            }
            departed = true;
        }
    }

    if let Some(host) = players.first().and_then(|p| p.session.as_ref()) {
        let names: Vec<String> = host.players().await?.into_iter().map(|p| p.name).collect();
        tracing::info!(room = %scenario.room, players = ?names, "[demo] Final roster seen by host");
    }

    for player in players {
        if let Some(session) = player.session {
            session.destroy().await;
        }
        if let Err(e) = player.logger.await {
            tracing::warn!(player = %player.name, error = %e, "[demo] Event logger failed");
        }
    }
    Ok(())
}
