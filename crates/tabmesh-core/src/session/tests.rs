use std::time::Duration;

use tabmesh_proto::{Color, Message, PeerId, PlayerState, RoomId, WireMessage};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

use super::{JoinParams, RoomSession, RoomSync};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::event::{DepartureReason, SyncEvent};
use crate::origin::Origin;
use crate::transport::{Inbound, TransportKind};

fn room() -> RoomId {
    RoomId::parse("ABCDEF").unwrap()
}

fn drain(events: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn joined_count(events: &[SyncEvent], peer: &PeerId) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SyncEvent::PeerJoined(p) if &p.id == peer))
        .count()
}

fn join_pair(origin: &Origin) -> (
    (RoomSync, mpsc::UnboundedReceiver<SyncEvent>),
    (RoomSync, mpsc::UnboundedReceiver<SyncEvent>),
) {
    let a = RoomSync::join(
        origin,
        JoinParams::new(room(), "Ann").with_color(Color::RED).as_host(),
        SyncConfig::default(),
    );
    let b = RoomSync::join(
        origin,
        JoinParams::new(room(), "Bob").with_color(Color::BLUE),
        SyncConfig::default(),
    );
    (a, b)
}

// Session driven by hand, without transports.

fn bare_session() -> (RoomSession, mpsc::UnboundedReceiver<SyncEvent>) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let session = RoomSession::new(
        PeerId::from("me"),
        JoinParams::new(room(), "Me"),
        SyncConfig::default(),
        Vec::new(),
        events_tx,
    );
    (session, events_rx)
}

fn inbound(message: Message) -> Inbound {
    Inbound {
        message: WireMessage::stamp(message),
        via: TransportKind::Direct,
    }
}

fn join_from(peer: &str, name: &str) -> Message {
    Message::PlayerJoin {
        peer_id: PeerId::from(peer),
        name: name.to_string(),
        color: Color::GREEN,
    }
}

#[test]
fn test_own_messages_are_ignored() {
    let (mut session, mut events) = bare_session();
    session.handle_inbound(inbound(join_from("me", "Me")), Instant::now());
    assert!(drain(&mut events).is_empty());
    assert!(session.registry().is_empty());
}

#[test]
fn test_duplicate_delivery_has_one_effect() {
    let (mut session, mut events) = bare_session();
    let wire = inbound(Message::LevelChange {
        peer_id: PeerId::from("x"),
        level: 4,
    });
    session.handle_inbound(wire.clone(), Instant::now());
    session.handle_inbound(
        Inbound {
            via: TransportKind::StoreRelay,
            ..wire
        },
        Instant::now(),
    );

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        SyncEvent::Message(Message::LevelChange { level: 4, .. })
    ));
    // levelChange alone does not make a peer known.
    assert!(session.registry().is_empty());
}

#[test]
fn test_join_notifications_fire_once() {
    let (mut session, mut events) = bare_session();
    let now = Instant::now();
    let scheduled = session.pending_announcements();

    session.handle_inbound(inbound(join_from("x", "Xena")), now);
    let first = drain(&mut events);
    assert_eq!(first.len(), 4);
    assert!(matches!(&first[0], SyncEvent::PeerJoined(p) if p.name == "Xena"));
    assert_eq!(first[1], SyncEvent::Status("Xena joined".to_string()));
    assert_eq!(first[2], SyncEvent::ConnectionChange { count: 1 });
    assert!(matches!(&first[3], SyncEvent::PlayerListChange { players } if players.len() == 1));
    // A reply announcement was scheduled.
    assert_eq!(session.pending_announcements(), scheduled + 1);

    session.handle_inbound(inbound(join_from("x", "Xena")), now);
    session.handle_inbound(
        inbound(Message::Heartbeat {
            peer_id: PeerId::from("x"),
            name: "Xena".to_string(),
            color: Color::GREEN,
        }),
        now,
    );
    assert!(drain(&mut events).is_empty());
    assert_eq!(session.pending_announcements(), scheduled + 1);
}

#[test]
fn test_player_update_introduces_unknown_peer() {
    let (mut session, mut events) = bare_session();
    let player = PlayerState::new("Yuri", Color::CYAN).at(1.0, 2.0);
    session.handle_inbound(
        inbound(Message::PlayerUpdate {
            peer_id: PeerId::from("y"),
            player: player.clone(),
        }),
        Instant::now(),
    );

    let events = drain(&mut events);
    assert_eq!(joined_count(&events, &PeerId::from("y")), 1);
    assert!(matches!(
        events.last(),
        Some(SyncEvent::Message(Message::PlayerUpdate { player: p, .. })) if *p == player
    ));
    let info = session.registry().get(&PeerId::from("y")).unwrap();
    assert_eq!(info.name, "Yuri");
    assert_eq!(info.color, Color::CYAN);
}

#[test]
fn test_player_left_always_reports_membership() {
    let (mut session, mut events) = bare_session();
    let now = Instant::now();

    // Unknown peer: raw message plus membership pair only.
    session.handle_inbound(
        inbound(Message::PlayerLeft {
            peer_id: PeerId::from("ghost"),
        }),
        now,
    );
    let events_unknown = drain(&mut events);
    assert_eq!(events_unknown.len(), 3);
    assert!(matches!(&events_unknown[0], SyncEvent::Message(Message::PlayerLeft { .. })));
    assert_eq!(events_unknown[1], SyncEvent::ConnectionChange { count: 0 });

    session.handle_inbound(inbound(join_from("x", "Xena")), now);
    drain(&mut events);
    session.handle_inbound(
        inbound(Message::PlayerLeft {
            peer_id: PeerId::from("x"),
        }),
        now,
    );
    let events_known = drain(&mut events);
    assert_eq!(events_known.len(), 5);
    assert_eq!(
        events_known[0],
        SyncEvent::PeerLeft {
            peer_id: PeerId::from("x"),
            name: "Xena".to_string(),
            reason: DepartureReason::Announced,
        }
    );
    assert_eq!(events_known[1], SyncEvent::Status("Xena left".to_string()));
    assert!(session.registry().is_empty());
}

#[test]
fn test_liveness_scan_evicts_once() {
    let (mut session, mut events) = bare_session();
    let t0 = Instant::now();
    session.handle_inbound(inbound(join_from("x", "Xena")), t0);
    session.handle_inbound(inbound(join_from("z", "Zoe")), t0 + Duration::from_millis(2000));
    drain(&mut events);

    session.scan_liveness(t0 + Duration::from_millis(3000));
    assert!(drain(&mut events).is_empty());

    session.scan_liveness(t0 + Duration::from_millis(3001));
    let evicted = drain(&mut events);
    let departures: Vec<_> = evicted
        .iter()
        .filter(|e| matches!(e, SyncEvent::PeerLeft { reason: DepartureReason::TimedOut, .. }))
        .collect();
    assert_eq!(departures.len(), 1);
    let pairs = evicted
        .iter()
        .filter(|e| matches!(e, SyncEvent::ConnectionChange { .. }))
        .count();
    assert_eq!(pairs, 1);
    assert!(evicted.contains(&SyncEvent::ConnectionChange { count: 1 }));
    assert!(session.registry().contains(&PeerId::from("z")));
}

#[test]
fn test_liveness_scan_reports_membership_once_for_many() {
    let (mut session, mut events) = bare_session();
    let t0 = Instant::now();
    session.handle_inbound(inbound(join_from("x", "Xena")), t0);
    session.handle_inbound(inbound(join_from("y", "Yuri")), t0);
    session.handle_inbound(inbound(join_from("z", "Zoe")), t0 + Duration::from_millis(2000));
    drain(&mut events);

    session.scan_liveness(t0 + Duration::from_millis(3500));
    let evicted = drain(&mut events);

    let mut departed: Vec<&str> = evicted
        .iter()
        .filter_map(|e| match e {
            SyncEvent::PeerLeft {
                name,
                reason: DepartureReason::TimedOut,
                ..
            } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    departed.sort_unstable();
    assert_eq!(departed, vec!["Xena", "Yuri"]);

    let statuses = evicted
        .iter()
        .filter(|e| matches!(e, SyncEvent::Status(text) if text.ends_with(" left")))
        .count();
    assert_eq!(statuses, 2);

    // One aggregate pair, last, carrying the surviving peer.
    assert_eq!(evicted.len(), 6);
    assert_eq!(evicted[4], SyncEvent::ConnectionChange { count: 1 });
    assert!(matches!(
        &evicted[5],
        SyncEvent::PlayerListChange { players } if players.len() == 1 && players[0].name == "Zoe"
    ));
    assert_eq!(session.registry().len(), 1);
}

// Full sessions over a shared origin, in paused time.

#[tokio::test(start_paused = true)]
async fn test_mutual_discovery() {
    let origin = Origin::new();
    let ((a, mut a_events), (b, mut b_events)) = join_pair(&origin);

    sleep(Duration::from_millis(250)).await;

    let a_players = a.players().await.unwrap();
    let b_players = b.players().await.unwrap();
    assert_eq!(a_players.len(), 1);
    assert_eq!(&a_players[0].id, b.peer_id());
    assert_eq!(a_players[0].name, "Bob");
    assert_eq!(&b_players[0].id, a.peer_id());
    assert_eq!(a.connection_count().await.unwrap(), 1);
    assert_eq!(b.connection_count().await.unwrap(), 1);

    let a_seen = drain(&mut a_events);
    assert_eq!(a_seen[0], SyncEvent::Status("Created room ABCDEF".to_string()));
    let b_seen = drain(&mut b_events);
    assert_eq!(b_seen[0], SyncEvent::Status("Joined room ABCDEF".to_string()));

    // Repeated announcements and heartbeats never re-fire the join.
    sleep(Duration::from_millis(3000)).await;
    let a_seen: Vec<_> = a_seen.into_iter().chain(drain(&mut a_events)).collect();
    assert_eq!(joined_count(&a_seen, b.peer_id()), 1);
    assert_eq!(a.connection_count().await.unwrap(), 1);

    a.destroy().await;
    b.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_player_update_arrives_unchanged() {
    let origin = Origin::new();
    let ((a, _a_events), (b, mut b_events)) = join_pair(&origin);
    sleep(Duration::from_millis(250)).await;
    drain(&mut b_events);

    let state = PlayerState::new("Ann", Color::RED).at(10.0, 20.0);
    a.send_player_update(state.clone()).unwrap();
    sleep(Duration::from_millis(20)).await;

    let updates: Vec<_> = drain(&mut b_events)
        .into_iter()
        .filter_map(|e| match e {
            SyncEvent::Message(Message::PlayerUpdate { peer_id, player }) => Some((peer_id, player)),
            _ => None,
        })
        .collect();
    // Sent over both transports, delivered once.
    assert_eq!(updates.len(), 1);
    assert_eq!(&updates[0].0, a.peer_id());
    assert_eq!(updates[0].1, state);
    assert!((updates[0].1.x - 10.0).abs() < f32::EPSILON);
    assert!((updates[0].1.y - 20.0).abs() < f32::EPSILON);

    a.destroy().await;
    b.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_crashed_peer_is_evicted() {
    let origin = Origin::new();
    let ((a, _a_events), (b, mut b_events)) = join_pair(&origin);
    let a_id = a.peer_id().clone();

    sleep(Duration::from_millis(1000)).await;
    a.abort();

    sleep(Duration::from_millis(2900)).await;
    assert_eq!(b.connection_count().await.unwrap(), 1);

    sleep(Duration::from_millis(2100)).await;
    assert_eq!(b.connection_count().await.unwrap(), 0);

    let departures: Vec<_> = drain(&mut b_events)
        .into_iter()
        .filter(|e| matches!(e, SyncEvent::PeerLeft { .. }))
        .collect();
    assert_eq!(
        departures,
        vec![SyncEvent::PeerLeft {
            peer_id: a_id,
            name: "Ann".to_string(),
            reason: DepartureReason::TimedOut,
        }]
    );

    b.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_destroy_announces_departure() {
    let origin = Origin::new();
    let ((a, mut a_events), (b, _b_events)) = join_pair(&origin);
    let b_id = b.peer_id().clone();
    sleep(Duration::from_millis(250)).await;
    drain(&mut a_events);

    b.destroy().await;
    sleep(Duration::from_millis(20)).await;

    let seen = drain(&mut a_events);
    assert_eq!(
        seen[0],
        SyncEvent::PeerLeft {
            peer_id: b_id.clone(),
            name: "Bob".to_string(),
            reason: DepartureReason::Announced,
        }
    );
    assert_eq!(seen[1], SyncEvent::Status("Bob left".to_string()));
    assert_eq!(seen[2], SyncEvent::Message(Message::PlayerLeft { peer_id: b_id }));
    assert_eq!(seen[3], SyncEvent::ConnectionChange { count: 0 });
    assert_eq!(seen[4], SyncEvent::PlayerListChange { players: Vec::new() });
    assert_eq!(seen.len(), 5);

    a.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_dropped_handle_leaves_room() {
    let origin = Origin::new();
    let ((a, _a_events), (b, _b_events)) = join_pair(&origin);
    sleep(Duration::from_millis(250)).await;

    drop(b);
    sleep(Duration::from_millis(20)).await;
    assert_eq!(a.connection_count().await.unwrap(), 0);

    a.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_gets_reply() {
    let origin = Origin::new();
    let (a, _a_events) = RoomSync::join(
        &origin,
        JoinParams::new(room(), "Ann").as_host(),
        SyncConfig::default(),
    );
    // Past the last scheduled repeat and between two heartbeats.
    sleep(Duration::from_millis(3000)).await;

    let (b, _b_events) = RoomSync::join(&origin, JoinParams::new(room(), "Bob"), SyncConfig::default());
    sleep(Duration::from_millis(100)).await;

    let players = b.players().await.unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(&players[0].id, a.peer_id());

    a.destroy().await;
    b.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_room_events_reach_peers() {
    let origin = Origin::new();
    let ((a, _a_events), (b, mut b_events)) = join_pair(&origin);
    sleep(Duration::from_millis(250)).await;
    drain(&mut b_events);

    a.start_game(3).unwrap();
    a.send_level_change(2).unwrap();
    sleep(Duration::from_millis(20)).await;

    let seen = drain(&mut b_events);
    assert!(seen.contains(&SyncEvent::GameStart {
        level: 3,
        host: a.peer_id().clone(),
    }));
    assert!(seen.contains(&SyncEvent::Message(Message::LevelChange {
        peer_id: a.peer_id().clone(),
        level: 2,
    })));

    a.destroy().await;
    b.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_single_transport_is_enough() {
    for origin in [Origin::without_direct(), Origin::without_store()] {
        let ((a, mut a_events), (b, _b_events)) = join_pair(&origin);
        sleep(Duration::from_millis(250)).await;

        assert_eq!(a.connection_count().await.unwrap(), 1);
        assert_eq!(b.connection_count().await.unwrap(), 1);
        assert!(
            !drain(&mut a_events)
                .iter()
                .any(|e| matches!(e, SyncEvent::Error(_)))
        );

        a.destroy().await;
        b.destroy().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_isolated_session_reports_error() {
    let (a, mut a_events) = RoomSync::join(
        &Origin::isolated(),
        JoinParams::new(room(), "Ann"),
        SyncConfig::default(),
    );
    sleep(Duration::from_millis(10)).await;

    let seen = drain(&mut a_events);
    assert!(matches!(&seen[0], SyncEvent::Error(text) if text.contains("ABCDEF")));
    // Still answers queries.
    assert_eq!(a.connection_count().await.unwrap(), 0);
    a.send_player_update(PlayerState::new("Ann", Color::RED)).unwrap();

    a.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_dropped_event_receiver_keeps_session_running() {
    let origin = Origin::new();
    let ((a, a_events), (b, _b_events)) = join_pair(&origin);
    drop(a_events);

    sleep(Duration::from_millis(250)).await;
    b.send_player_update(PlayerState::new("Bob", Color::BLUE)).unwrap();
    sleep(Duration::from_millis(20)).await;

    assert_eq!(a.connection_count().await.unwrap(), 1);

    a.destroy().await;
    b.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_calls_fail_after_session_ends() {
    let (a, _a_events) = RoomSync::join(
        &Origin::new(),
        JoinParams::new(room(), "Ann"),
        SyncConfig::default(),
    );
    a.abort();
    sleep(Duration::from_millis(10)).await;

    assert!(matches!(
        a.send_player_update(PlayerState::new("Ann", Color::RED)),
        Err(SyncError::SessionClosed)
    ));
    assert!(matches!(a.start_game(1), Err(SyncError::SessionClosed)));
    assert!(matches!(a.players().await, Err(SyncError::SessionClosed)));
    assert!(matches!(a.connection_count().await, Err(SyncError::SessionClosed)));
}
