//! End-to-end dispatcher scenarios, driven without sockets: packets go
//! straight into `dispatch`, outbound traffic is drained from the
//! delivery queue.

use std::sync::Arc;

use parlor::{InfoPages, Outbound, RelayAdvert, ServerState, dispatch, testing};
use parlor_protocol::{Direction, Kind, Packet, commands};
use parlor_session::{MemoryStore, SessionStore, encode_session_fields};
use parlor_transport::ConnectionId;
use tokio::sync::mpsc;

struct Harness {
    state: Arc<ServerState>,
    rx: mpsc::Receiver<Outbound>,
    store: Arc<MemoryStore>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn SessionStore> = store.clone();
    let (state, rx) = ServerState::new(
        dyn_store,
        InfoPages::new("htm"),
        RelayAdvert::default(),
    );
    Harness { state, rx, store }
}

impl Harness {
    /// Drains and decodes everything queued so far.
    fn drain(&mut self) -> Vec<(ConnectionId, Packet)> {
        let mut out = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            let (packet, _) = parlor_protocol::decode(&frame.bytes)
                .expect("server emitted an undecodable frame");
            out.push((frame.conn, packet));
        }
        out
    }

    /// Runs the full login exchange for `user` on `conn`, so the session
    /// `user`-key is `12345678`.
    async fn login(&mut self, conn: u64, user: &str) -> ConnectionId {
        let conn = ConnectionId::new(conn);
        self.store.add_session("12345678", user);

        let seed = 2u16;
        let mut payload = vec![0x00, 0x0A];
        payload.extend_from_slice(&encode_session_fields(seed, 1234, 5678));
        let answer = Packet::new(
            commands::LOGIN,
            Kind::Answer,
            Direction::FromClient,
            seed,
            payload,
        );
        dispatch(&self.state, conn, answer).await;
        conn
    }

    async fn query(
        &mut self,
        conn: ConnectionId,
        command: u16,
        payload: Vec<u8>,
    ) {
        let packet = Packet::new(
            command,
            Kind::Query,
            Direction::FromClient,
            7,
            payload,
        );
        dispatch(&self.state, conn, packet).await;
    }

    /// Walks a logged-in client into area 1, room 1.
    async fn walk_to_room(&mut self, conn: ConnectionId) {
        self.query(conn, commands::AREASELECT, vec![0x00, 0x01]).await;
        self.query(conn, commands::ENTERROOM, vec![0x00, 0x01]).await;
        self.drain();
    }
}

fn packets_for(
    frames: &[(ConnectionId, Packet)],
    conn: ConnectionId,
    command: u16,
) -> Vec<Packet> {
    frames
        .iter()
        .filter(|(c, p)| *c == conn && p.command == command)
        .map(|(_, p)| p.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_creates_client_and_fires_version_check() {
    let mut h = harness();
    let conn = h.login(1, "user-1").await;

    {
        let directory = h.state.directory.lock().await;
        assert_eq!(directory.len(), 1);
        let client = directory.by_conn(conn).expect("client should exist");
        assert_eq!(client.session_key, "12345678");
    }

    // Lobby status persisted.
    assert_eq!(h.store.origin_of("user-1"), Some((1, 0, 0, 0)));

    let frames = h.drain();
    let checks = packets_for(&frames, conn, commands::CHECKVERSION);
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].kind, Kind::Query);
    assert_eq!(checks[0].payload, vec![0x00, 0x00]);
}

#[tokio::test]
async fn test_login_with_unknown_session_leaves_connection_clientless() {
    let mut h = harness();
    let conn = ConnectionId::new(1);

    // No session registered in the store.
    let mut payload = vec![0x00, 0x0A];
    payload.extend_from_slice(&encode_session_fields(2, 1111, 2222));
    let answer = Packet::new(
        commands::LOGIN,
        Kind::Answer,
        Direction::FromClient,
        2,
        payload,
    );
    dispatch(&h.state, conn, answer).await;

    assert!(h.state.directory.lock().await.is_empty());
    let frames = h.drain();
    assert!(packets_for(&frames, conn, commands::CHECKVERSION).is_empty());
}

#[tokio::test]
async fn test_duplicate_login_keeps_only_second_connection() {
    let mut h = harness();
    let first = h.login(1, "user-1").await;
    h.drain();
    let second = h.login(2, "user-1").await;

    let directory = h.state.directory.lock().await;
    assert_eq!(directory.len(), 1);
    assert!(directory.by_conn(first).is_none());
    assert!(directory.by_conn(second).is_some());
}

#[tokio::test]
async fn test_frames_without_client_are_dropped() {
    let mut h = harness();
    let conn = ConnectionId::new(9);

    h.query(conn, commands::AREASELECT, vec![0x00, 0x01]).await;

    assert!(h.state.directory.lock().await.is_empty());
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_unknown_command_is_ignored_not_fatal() {
    let mut h = harness();
    let conn = h.login(1, "user-1").await;
    h.drain();

    h.query(conn, 0x7FFF, vec![]).await;

    // Connection still has its client and produced no answer.
    assert!(h.state.directory.lock().await.by_conn(conn).is_some());
    assert!(h.drain().is_empty());
}

// ---------------------------------------------------------------------------
// Area navigation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_area_select_then_exit_returns_to_zero_and_broadcasts() {
    let mut h = harness();
    let conn = h.login(1, "user-1").await;
    h.drain();

    h.query(conn, commands::AREASELECT, vec![0x00, 0x01]).await;
    let frames = h.drain();
    let answers = packets_for(&frames, conn, commands::AREASELECT);
    assert_eq!(answers[0].payload, vec![0x00, 0x01]);
    // The selector itself observes the occupancy broadcast.
    let counts = packets_for(&frames, conn, commands::AREAPLAYERCNT);
    assert_eq!(counts.len(), 1);

    h.query(conn, commands::EXITAREA, vec![]).await;
    let frames = h.drain();
    assert_eq!(
        packets_for(&frames, conn, commands::EXITAREA).len(),
        1
    );
    let counts = packets_for(&frames, conn, commands::AREAPLAYERCNT);
    assert_eq!(counts.len(), 1);
    // Layout: [area:2][room-list:2][in-room:2][FF FF][after-game:2].
    let payload = &counts[0].payload;
    assert_eq!(payload.len(), 10);
    assert_eq!(&payload[..2], &[0x00, 0x01]);
    assert_eq!(&payload[6..8], &[0xFF, 0xFF]);

    let directory = h.state.directory.lock().await;
    assert_eq!(directory.by_conn(conn).unwrap().area, 0);
}

// ---------------------------------------------------------------------------
// Slot lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_host_creates_slot_and_becomes_player_one() {
    let mut h = harness();
    let conn = h.login(1, "host").await;
    h.walk_to_room(conn).await;

    h.query(conn, commands::CREATESLOT, vec![0x00, 0x01]).await;

    let frames = h.drain();
    let answers = packets_for(&frames, conn, commands::CREATESLOT);
    assert_eq!(answers[0].payload, vec![0x00, 0x01]);

    let directory = h.state.directory.lock().await;
    let client = directory.by_conn(conn).unwrap();
    assert_eq!(client.slot, 1);
    assert_eq!(client.player, 1);
    assert!(client.host);

    let lobby = h.state.lobby.lock().await;
    let slot = lobby.slot(1, 1, 1).unwrap();
    assert_eq!(
        slot.status(),
        parlor_lobby::SlotStatus::InCreation
    );
    assert_eq!(slot.host().unwrap().0, "host");
}

#[tokio::test]
async fn test_two_player_slot_rejects_third_join_as_full() {
    let mut h = harness();

    // Host creates a slot limited to two players and opens it.
    let host = h.login(1, "host").await;
    h.walk_to_room(host).await;
    h.query(host, commands::CREATESLOT, vec![0x00, 0x01]).await;
    h.query(host, commands::SETRULE, vec![0x00, 0x00]).await; // players: two
    h.query(host, commands::UNKN_6504, vec![0x01]).await;
    h.drain();

    // Second client joins successfully.
    let second = h.login(2, "second").await;
    h.walk_to_room(second).await;
    h.query(second, commands::JOINGAME, vec![0x00, 0x01]).await;
    let frames = h.drain();
    let join = packets_for(&frames, second, commands::JOINGAME);
    assert!(!join[0].error);
    assert_eq!(join[0].payload, vec![0x00, 0x01]);

    {
        let directory = h.state.directory.lock().await;
        assert_eq!(directory.count_in_slot(1, 1, 1), 2);
        assert_eq!(directory.by_conn(second).unwrap().player, 2);
        // Occupancy never exceeds the configured maximum.
        let lobby = h.state.lobby.lock().await;
        let max = lobby.slot(1, 1, 1).unwrap().rules().max_players();
        assert!(directory.count_in_slot(1, 1, 1) <= usize::from(max));
    }

    // Third client bounces off the now-busy slot.
    let third = h.login(3, "third").await;
    h.walk_to_room(third).await;
    h.query(third, commands::JOINGAME, vec![0x00, 0x01]).await;
    let frames = h.drain();
    let join = packets_for(&frames, third, commands::JOINGAME);
    assert!(join[0].error, "third join must be rejected");
    let text = String::from_utf8_lossy(&join[0].payload).into_owned();
    assert!(text.contains("game is full"), "got: {text}");

    let directory = h.state.directory.lock().await;
    assert_eq!(directory.count_in_slot(1, 1, 1), 2);
    assert_eq!(directory.by_conn(third).unwrap().slot, 0);
}

#[tokio::test]
async fn test_join_before_rules_set_is_not_possible() {
    let mut h = harness();
    let host = h.login(1, "host").await;
    h.walk_to_room(host).await;
    h.query(host, commands::CREATESLOT, vec![0x00, 0x01]).await;
    h.drain();

    let second = h.login(2, "second").await;
    h.walk_to_room(second).await;
    h.query(second, commands::JOINGAME, vec![0x00, 0x01]).await;

    let frames = h.drain();
    let join = packets_for(&frames, second, commands::JOINGAME);
    assert!(join[0].error);
    let text = String::from_utf8_lossy(&join[0].payload).into_owned();
    assert!(text.contains("not possible"), "got: {text}");
}

#[tokio::test]
async fn test_start_game_allocates_one_game_number_and_flips_busy() {
    let mut h = harness();
    let host = h.login(1, "host").await;
    h.walk_to_room(host).await;
    h.query(host, commands::CREATESLOT, vec![0x00, 0x01]).await;
    h.query(host, commands::UNKN_6504, vec![0x01]).await;

    let second = h.login(2, "second").await;
    h.walk_to_room(second).await;
    h.query(second, commands::JOINGAME, vec![0x00, 0x01]).await;
    h.drain();

    let start = Packet::new(
        commands::STARTGAME,
        Kind::Broadcast,
        Direction::FromClient,
        9,
        vec![],
    );
    dispatch(&h.state, host, start).await;

    let frames = h.drain();
    // Both occupants get exactly one GETREADY.
    assert_eq!(
        packets_for(&frames, host, commands::GETREADY).len(),
        1
    );
    assert_eq!(
        packets_for(&frames, second, commands::GETREADY).len(),
        1
    );

    let directory = h.state.directory.lock().await;
    let host_game = directory.by_conn(host).unwrap().game_number;
    let second_game = directory.by_conn(second).unwrap().game_number;
    assert!(host_game > 0);
    assert_eq!(host_game, second_game);

    let lobby = h.state.lobby.lock().await;
    let slot = lobby.slot(1, 1, 1).unwrap();
    assert_eq!(slot.status(), parlor_lobby::SlotStatus::Busy);
    assert_eq!(slot.game_number(), host_game);
}

#[tokio::test]
async fn test_host_cancel_resets_slot() {
    let mut h = harness();
    let host = h.login(1, "host").await;
    h.walk_to_room(host).await;
    h.query(host, commands::CREATESLOT, vec![0x00, 0x02]).await;
    h.query(host, commands::SLOTPASSWD, {
        parlor_protocol::crypt::encrypt_field(b"pw", 7)
    })
    .await;
    h.drain();

    h.query(host, commands::CANCELSLOT, vec![]).await;

    let frames = h.drain();
    assert_eq!(
        packets_for(&frames, host, commands::CANCELSLOT).len(),
        1
    );

    let directory = h.state.directory.lock().await;
    let client = directory.by_conn(host).unwrap();
    assert_eq!(client.slot, 0);
    assert_eq!(client.player, 0);
    assert!(!client.host);

    let lobby = h.state.lobby.lock().await;
    let slot = lobby.slot(1, 1, 2).unwrap();
    assert_eq!(slot.status(), parlor_lobby::SlotStatus::Free);
    assert_eq!(slot.name(), b"(free)");
    assert_eq!(slot.protection(), 0);
}

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_liveness_evicts_only_after_full_silent_cycle() {
    let mut h = harness();
    let conn = h.login(1, "user-1").await;
    h.drain();

    // First sweep: the client answered login recently, so it is pinged
    // and its flag cleared.
    testing::liveness_check(&h.state).await;
    let frames = h.drain();
    assert_eq!(
        packets_for(&frames, conn, commands::CONNCHECK).len(),
        1
    );
    assert!(h.state.directory.lock().await.by_conn(conn).is_some());

    // The client answers: survives the next sweep too.
    let answer = Packet::new(
        commands::CONNCHECK,
        Kind::Answer,
        Direction::FromClient,
        3,
        vec![],
    );
    dispatch(&h.state, conn, answer).await;
    testing::liveness_check(&h.state).await;
    assert!(h.state.directory.lock().await.by_conn(conn).is_some());

    // Silence for a full cycle: evicted.
    testing::liveness_check(&h.state).await;
    assert!(h.state.directory.lock().await.by_conn(conn).is_none());
}

#[tokio::test]
async fn test_after_game_lobby_clients_exempt_from_liveness() {
    let mut h = harness();
    h.store.set_game_number("user-1", 42);
    let conn = h.login(1, "user-1").await;
    h.drain();

    // The pending game routed this client into the after-game lobby.
    assert_eq!(
        h.state.directory.lock().await.by_conn(conn).unwrap().area,
        parlor_lobby::AGL_AREA
    );

    // No matter how many sweeps pass, the AGL client is never pinged
    // nor evicted by this path.
    for _ in 0..3 {
        testing::liveness_check(&h.state).await;
    }
    let frames = h.drain();
    assert!(packets_for(&frames, conn, commands::CONNCHECK).is_empty());
    assert!(h.state.directory.lock().await.by_conn(conn).is_some());
}

#[tokio::test]
async fn test_heartbeat_ping_reaches_every_client() {
    let mut h = harness();
    let a = h.login(1, "a").await;
    let b = h.login(2, "b").await;
    h.drain();

    testing::broadcast_ping(&h.state).await;

    let frames = h.drain();
    for conn in [a, b] {
        let pings = packets_for(&frames, conn, commands::HEARTBEAT);
        assert_eq!(pings.len(), 1);
        assert_eq!(
            pings[0].payload,
            vec![0x00, 0x02, 0x00, 0x01, 0x03, 0xE7, 0x00, 0x01]
        );
    }
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_ghost_slot_reclaimed_once() {
    let mut h = harness();
    let watcher = h.login(1, "watcher").await;
    h.walk_to_room(watcher).await;

    {
        let mut lobby = h.state.lobby.lock().await;
        lobby
            .slot_mut(1, 1, 5)
            .unwrap()
            .set_status(parlor_lobby::SlotStatus::RuleSet);
    }

    testing::clean_ghost_slots(&h.state).await;
    {
        let lobby = h.state.lobby.lock().await;
        assert_eq!(
            lobby.slot(1, 1, 5).unwrap().status(),
            parlor_lobby::SlotStatus::Free
        );
    }
    let frames = h.drain();
    let statuses: Vec<_> = packets_for(&frames, watcher, commands::SLOTSTATUS)
        .into_iter()
        .filter(|p| p.payload.starts_with(&[0x00, 0x05]))
        .collect();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].payload, vec![0x00, 0x05, 0x01]);

    // A second sweep finds nothing to do.
    testing::clean_ghost_slots(&h.state).await;
    let frames = h.drain();
    assert!(packets_for(&frames, watcher, commands::SLOTSTATUS).is_empty());
}
