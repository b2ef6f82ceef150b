use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::ControlFlow;

use tabmesh_proto::{Color, Message, PeerId, RoomId, WireMessage};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};

use super::{Command, JoinParams};
use crate::config::SyncConfig;
use crate::dedup::MessageDeduplicator;
use crate::event::{DepartureReason, SyncEvent};
use crate::registry::{PeerRegistry, RemotePlayerInfo};
use crate::transport::{Inbound, Transport};

/// Protocol state of one session. Owned by the task spawned in
/// [`RoomSync::join`](super::RoomSync::join); never shared.
pub struct RoomSession {
    peer_id: PeerId,
    room_id: RoomId,
    name: String,
    color: Color,
    is_host: bool,
    config: SyncConfig,
    transports: Vec<Box<dyn Transport>>,
    dedup: MessageDeduplicator,
    registry: PeerRegistry,
    /// Pending join announcements, earliest first.
    announcements: BinaryHeap<Reverse<Instant>>,
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl RoomSession {
    pub fn new(
        peer_id: PeerId,
        params: JoinParams,
        config: SyncConfig,
        transports: Vec<Box<dyn Transport>>,
        events: mpsc::UnboundedSender<SyncEvent>,
    ) -> Self {
        let created = Instant::now();
        let announcements = config
            .join_announce_delays()
            .map(|delay| Reverse(created + delay))
            .collect();
        let dedup = MessageDeduplicator::new(config.dedup_high_water, config.dedup_low_water);

        Self {
            peer_id,
            room_id: params.room_id,
            name: params.name,
            color: params.color,
            is_host: params.is_host,
            config,
            transports,
            dedup,
            registry: PeerRegistry::new(),
            announcements,
            events,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Join announcements still scheduled, including pending replies.
    pub fn pending_announcements(&self) -> usize {
        self.announcements.len()
    }

    /// Drive the session until destroyed or until the handle is dropped.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut inbound: mpsc::UnboundedReceiver<Inbound>,
    ) {
        let start = Instant::now();
        self.report_startup();
        self.announce();

        let heartbeat_period = self.config.heartbeat_interval();
        let mut heartbeat = interval_at(start + heartbeat_period, heartbeat_period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let scan_period = self.config.liveness_scan_interval();
        let mut liveness = interval_at(start + scan_period, scan_period);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let next_announcement = self.announcements.peek().map(|Reverse(at)| *at);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).is_break() {
                            return;
                        }
                    }
                    None => {
                        self.shutdown();
                        return;
                    }
                },
                Some(item) = inbound.recv() => self.handle_inbound(item, Instant::now()),
                _ = heartbeat.tick() => self.send_heartbeat(),
                _ = liveness.tick() => self.scan_liveness(Instant::now()),
                () = sleep_until(next_announcement.unwrap_or(start)), if next_announcement.is_some() => {
                    self.fire_due_announcements(Instant::now());
                }
            }
        }
    }

    fn report_startup(&self) {
        if self.transports.is_empty() {
            tracing::error!(room = %self.room_id, peer = %self.peer_id, "[session] No transport available");
            self.emit(SyncEvent::Error(format!(
                "No transport available for room {}; this session cannot see other players",
                self.room_id
            )));
            return;
        }

        let kinds: Vec<String> = self.transports.iter().map(|t| t.kind().to_string()).collect();
        tracing::info!(
            room = %self.room_id,
            peer = %self.peer_id,
            host = self.is_host,
            transports = %kinds.join(","),
            "[session] Session started"
        );
        let status = if self.is_host {
            format!("Created room {}", self.room_id)
        } else {
            format!("Joined room {}", self.room_id)
        };
        self.emit(SyncEvent::Status(status));
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Broadcast(message) => self.broadcast(message),
            Command::Players(reply) => {
                let _ = reply.send(self.registry.summaries());
            }
            Command::ConnectionCount(reply) => {
                let _ = reply.send(self.registry.len());
            }
            Command::Destroy(done) => {
                self.shutdown();
                let _ = done.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Stamp `message` and push it through every open transport.
    fn broadcast(&self, message: Message) {
        let wire = WireMessage::stamp(message);
        tracing::trace!(kind = %wire.message.kind(), id = %wire.message_id, "[session] Broadcasting");

        for transport in &self.transports {
            if let Err(e) = transport.send(&wire) {
                tracing::warn!(
                    transport = %transport.kind(),
                    kind = %wire.message.kind(),
                    error = %e,
                    "[session] Send failed"
                );
            }
        }
    }

    fn announce(&self) {
        self.broadcast(Message::PlayerJoin {
            peer_id: self.peer_id.clone(),
            name: self.name.clone(),
            color: self.color,
        });
    }

    fn send_heartbeat(&self) {
        self.broadcast(Message::Heartbeat {
            peer_id: self.peer_id.clone(),
            name: self.name.clone(),
            color: self.color,
        });
    }

    /// Pop every announcement deadline that has passed and announce once.
    fn fire_due_announcements(&mut self, now: Instant) {
        let mut due = false;
        while let Some(Reverse(at)) = self.announcements.peek() {
            if *at > now {
                break;
            }
            self.announcements.pop();
            due = true;
        }
        if due {
            self.announce();
        }
    }

    /// Self-filter, deduplicate, then dispatch one received message.
    pub fn handle_inbound(&mut self, item: Inbound, now: Instant) {
        let Inbound { message: wire, via } = item;

        if wire.message.sender() == &self.peer_id {
            return;
        }
        if !self.dedup.should_process(&wire.message_id) {
            tracing::trace!(id = %wire.message_id, via = %via, "[session] Duplicate dropped");
            return;
        }

        tracing::trace!(
            kind = %wire.message.kind(),
            from = %wire.message.sender(),
            via = %via,
            "[session] Received"
        );
        self.dispatch(wire.into_message(), now);
    }

    fn dispatch(&mut self, message: Message, now: Instant) {
        match message {
            Message::PlayerUpdate { ref peer_id, ref player } => {
                if self.registry.observe_update(peer_id, &player.name, player.color, now) {
                    self.peer_joined(peer_id);
                }
                self.emit(SyncEvent::Message(message));
            }
            Message::LevelChange { ref peer_id, .. } => {
                self.registry.touch(peer_id, now);
                self.emit(SyncEvent::Message(message));
            }
            Message::StartGame { peer_id, level } => {
                self.registry.touch(&peer_id, now);
                tracing::info!(room = %self.room_id, host = %peer_id, level, "[session] Game started");
                self.emit(SyncEvent::GameStart {
                    level,
                    host: peer_id,
                });
            }
            Message::PlayerJoin {
                peer_id,
                name,
                color,
            } => {
                if self.registry.announce(&peer_id, &name, color, now) {
                    self.peer_joined(&peer_id);
                    self.announcements
                        .push(Reverse(now + self.config.join_reply_delay()));
                }
            }
            Message::Heartbeat {
                peer_id,
                name,
                color,
            } => {
                if self.registry.announce(&peer_id, &name, color, now) {
                    self.peer_joined(&peer_id);
                }
            }
            Message::PlayerLeft { ref peer_id } => {
                if let Some(info) = self.registry.remove(peer_id) {
                    self.peer_left(info, DepartureReason::Announced);
                }
                self.emit(SyncEvent::Message(message));
                self.emit_membership();
            }
        }
    }

    fn peer_joined(&self, peer_id: &PeerId) {
        let Some(info) = self.registry.get(peer_id) else {
            return;
        };
        tracing::info!(room = %self.room_id, peer = %peer_id, name = %info.name, "[session] Peer joined");
        let summary = info.summary();
        let status = format!("{} joined", summary.name);
        self.emit(SyncEvent::PeerJoined(summary));
        self.emit(SyncEvent::Status(status));
        self.emit_membership();
    }

    fn peer_left(&self, info: RemotePlayerInfo, reason: DepartureReason) {
        tracing::info!(
            room = %self.room_id,
            peer = %info.id,
            name = %info.name,
            reason = %reason,
            "[session] Peer left"
        );
        let status = format!("{} left", info.name);
        self.emit(SyncEvent::PeerLeft {
            peer_id: info.id,
            name: info.name,
            reason,
        });
        self.emit(SyncEvent::Status(status));
    }

    /// Evict peers silent for longer than the liveness window.
    pub fn scan_liveness(&mut self, now: Instant) {
        let evicted = self.registry.evict_stale(now, self.config.liveness_window());
        if evicted.is_empty() {
            return;
        }
        for info in evicted {
            self.peer_left(info, DepartureReason::TimedOut);
        }
        self.emit_membership();
    }

    fn emit_membership(&self) {
        self.emit(SyncEvent::ConnectionChange {
            count: self.registry.len(),
        });
        self.emit(SyncEvent::PlayerListChange {
            players: self.registry.summaries(),
        });
    }

    fn emit(&self, event: SyncEvent) {
        // The game may stop listening before the session ends.
        let _ = self.events.send(event);
    }

    fn shutdown(&mut self) {
        self.broadcast(Message::PlayerLeft {
            peer_id: self.peer_id.clone(),
        });
        self.transports.clear();
        self.registry.clear();
        self.announcements.clear();
        tracing::info!(room = %self.room_id, peer = %self.peer_id, "[session] Session closed");
    }
}
