//! Socket-level tests: the real listeners, read loops, and the delivery
//! pipeline, driven by hand-rolled client bytes.

use std::sync::Arc;
use std::time::Duration;

use parlor::{ParlorServer, ServerConfig};
use parlor_protocol::{Direction, HEADER_LEN, Kind, Packet, commands};
use parlor_session::{MemoryStore, SessionStore, encode_session_fields};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

async fn start_server(store: Arc<MemoryStore>) -> (std::net::SocketAddr, std::net::SocketAddr)
{
    let config = ServerConfig {
        lobby_addr: "127.0.0.1:0".into(),
        relay_addr: "127.0.0.1:0".into(),
        ..ServerConfig::default()
    };
    let dyn_store: Arc<dyn SessionStore> = store;
    let server = ParlorServer::bind(config, dyn_store)
        .await
        .expect("bind should succeed");
    let addrs = (server.lobby_addr(), server.relay_addr());
    tokio::spawn(server.run());
    addrs
}

/// Reads exactly one protocol frame from the stream.
async fn read_frame(stream: &mut TcpStream) -> Packet {
    let mut header = [0u8; HEADER_LEN];
    timeout(Duration::from_secs(5), stream.read_exact(&mut header))
        .await
        .expect("timed out reading header")
        .expect("read header");
    let payload_len =
        usize::from(u16::from_be_bytes([header[4], header[5]]));
    let mut frame = header.to_vec();
    frame.resize(HEADER_LEN + payload_len, 0);
    timeout(
        Duration::from_secs(5),
        stream.read_exact(&mut frame[HEADER_LEN..]),
    )
    .await
    .expect("timed out reading payload")
    .expect("read payload");
    parlor_protocol::decode(&frame).expect("decodable frame").0
}

#[tokio::test]
async fn test_lobby_handshake_over_tcp() {
    let store = Arc::new(MemoryStore::new());
    store.add_session("12345678", "user-1");
    let (lobby_addr, _) = start_server(store.clone()).await;

    let mut stream = TcpStream::connect(lobby_addr).await.unwrap();

    // The server speaks first with its login query and seed.
    let login = read_frame(&mut stream).await;
    assert_eq!(login.command, commands::LOGIN);
    assert_eq!(login.kind, Kind::Query);
    assert_eq!(login.direction, Direction::FromServer);
    assert_eq!(login.payload, vec![0x28, 0x37]);

    // Answer with the session fields; the server moves on to the
    // version check.
    let mut payload = vec![0x00, 0x0A];
    payload
        .extend_from_slice(&encode_session_fields(login.sequence_id, 1234, 5678));
    let answer = Packet::new(
        commands::LOGIN,
        Kind::Answer,
        Direction::FromClient,
        login.sequence_id,
        payload,
    );
    stream
        .write_all(&parlor_protocol::encode(&answer))
        .await
        .unwrap();

    let check = read_frame(&mut stream).await;
    assert_eq!(check.command, commands::CHECKVERSION);
    assert_eq!(check.kind, Kind::Query);

    // Lobby origin persisted through the store.
    assert_eq!(store.origin_of("user-1"), Some((1, 0, 0, 0)));
}

#[tokio::test]
async fn test_relay_forwards_between_session_members_only() {
    let store = Arc::new(MemoryStore::new());
    store.add_session("12345678", "player-a");
    store.add_session("11112222", "player-b");
    store.set_game_number("player-a", 9);
    store.set_game_number("player-b", 9);
    let (_, relay_addr) = start_server(store).await;

    let mut a = TcpStream::connect(relay_addr).await.unwrap();
    let mut b = TcpStream::connect(relay_addr).await.unwrap();

    // Both get the relay's login query and answer it.
    for (stream, a_half, b_half) in
        [(&mut a, 1234u32, 5678u32), (&mut b, 1111, 2222)]
    {
        let login = read_frame(stream).await;
        assert_eq!(login.command, commands::GSLOGIN);
        assert_eq!(login.direction, Direction::FromRelayServer);

        let answer = Packet::new(
            commands::GSLOGIN,
            Kind::Answer,
            Direction::FromRelayClient,
            login.sequence_id,
            encode_session_fields(login.sequence_id, a_half, b_half),
        );
        stream
            .write_all(&parlor_protocol::encode(&answer))
            .await
            .unwrap();
    }
    // Let both logins settle before traffic flows.
    tokio::time::sleep(Duration::from_millis(200)).await;

    // A sends one length-byte-framed chunk of game traffic.
    let traffic = [4u8, 0xDE, 0xAD, 0xBE];
    a.write_all(&traffic).await.unwrap();

    // B receives it verbatim.
    let mut received = [0u8; 4];
    timeout(Duration::from_secs(5), b.read_exact(&mut received))
        .await
        .expect("timed out waiting for forwarded traffic")
        .unwrap();
    assert_eq!(received, traffic);

    // Nothing comes back to the sender.
    let mut echo = [0u8; 1];
    let echoed =
        timeout(Duration::from_millis(300), a.read_exact(&mut echo)).await;
    assert!(echoed.is_err(), "traffic must not echo to the sender");
}
