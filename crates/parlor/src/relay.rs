//! The game relay bridge.
//!
//! A second, smaller instance of the same framing/dispatch pattern: each
//! relay connection proves a session with a login-style exchange, then
//! every other frame it sends is forwarded verbatim to the other relay
//! connections sharing its game number — never echoed to the sender.
//! Relay state is independent of the lobby directory; tearing down a
//! relay connection never touches unrelated lobby state.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use parlor_protocol::{Direction, Kind, Packet, commands};
use parlor_session::{OnlineStatus, UserId, derive_session_key};
use parlor_transport::{ConnectionId, StreamBuffer, TcpAcceptor};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::state::ServerState;

/// One authenticated relay connection.
#[derive(Debug, Clone)]
pub struct RelayClient {
    pub conn: ConnectionId,
    pub user: UserId,
    pub game_number: u32,
    pub alive: bool,
}

/// The relay's own client list plus its packet-id counter.
#[derive(Default)]
pub struct RelayRoster {
    clients: Mutex<Vec<RelayClient>>,
    packet_ids: AtomicU16,
}

impl RelayRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_packet_id(&self) -> u16 {
        self.packet_ids.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Adds a client, evicting any entry for the same user first.
    /// Returns the evicted entries so their connections can be closed.
    pub fn add(&self, client: RelayClient) -> Vec<RelayClient> {
        let mut clients = self.clients.lock().unwrap();
        let mut evicted = Vec::new();
        let mut i = 0;
        while i < clients.len() {
            if clients[i].user == client.user || clients[i].conn == client.conn
            {
                evicted.push(clients.remove(i));
            } else {
                i += 1;
            }
        }
        clients.push(client);
        evicted
    }

    pub fn remove(&self, conn: ConnectionId) -> Option<RelayClient> {
        let mut clients = self.clients.lock().unwrap();
        let idx = clients.iter().position(|c| c.conn == conn)?;
        Some(clients.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().unwrap().is_empty()
    }

    /// Marks a client alive and returns its game number.
    pub fn mark_alive(&self, conn: ConnectionId) -> Option<u32> {
        let mut clients = self.clients.lock().unwrap();
        let client = clients.iter_mut().find(|c| c.conn == conn)?;
        client.alive = true;
        Some(client.game_number)
    }

    /// Forwarding targets: same game number, not the sender.
    pub fn targets(
        &self,
        game_number: u32,
        sender: ConnectionId,
    ) -> Vec<ConnectionId> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.game_number == game_number && c.conn != sender)
            .map(|c| c.conn)
            .collect()
    }

    /// One liveness cycle: clients seen since the last cycle are flipped
    /// back to unseen; the rest are removed and returned for eviction.
    pub fn sweep_liveness(&self) -> Vec<RelayClient> {
        let mut clients = self.clients.lock().unwrap();
        let mut evicted = Vec::new();
        let mut i = 0;
        while i < clients.len() {
            if clients[i].alive {
                clients[i].alive = false;
                i += 1;
            } else {
                evicted.push(clients.remove(i));
            }
        }
        evicted
    }
}

// ---------------------------------------------------------------------------
// Relay server
// ---------------------------------------------------------------------------

/// Accept loop for the relay listener.
pub async fn run_relay(state: Arc<ServerState>, mut acceptor: TcpAcceptor) {
    loop {
        match acceptor.accept().await {
            Ok((stream, conn, peer)) => {
                tracing::info!(%conn, %peer, "relay connection");
                let state = Arc::clone(&state);
                tokio::spawn(run_relay_connection(state, stream, conn));
            }
            Err(err) => {
                tracing::warn!(%err, "relay accept failed");
            }
        }
    }
}

/// Serves one relay connection from accept to close.
pub async fn run_relay_connection(
    state: Arc<ServerState>,
    stream: TcpStream,
    conn: ConnectionId,
) {
    let (mut read_half, write_half) = stream.into_split();
    let mut close_rx = state.connections.register(conn, write_half);

    // The relay speaks first: a login query the client answers with its
    // session fields.
    let login = Packet::empty(
        commands::GSLOGIN,
        Kind::Query,
        Direction::FromRelayServer,
        state.relay_roster.next_packet_id(),
    );
    state.send(conn, &login);

    let mut buffer = StreamBuffer::new();
    let mut chunk = [0u8; 1024];
    loop {
        tokio::select! {
            _ = &mut close_rx => break,
            read = read_half.read(&mut chunk) => match read {
                Ok(0) => break,
                Ok(n) => {
                    if let Err(err) = buffer.append(&chunk[..n]) {
                        tracing::warn!(%conn, %err, "relay buffer overflow");
                        break;
                    }
                    match buffer.extract_relay() {
                        Ok(Some(frames)) => {
                            handle_relay_frames(&state, conn, frames).await;
                        }
                        Ok(None) => {}
                        Err(err) => {
                            tracing::warn!(%conn, %err, "relay framing error");
                            break;
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(%conn, %err, "relay read error");
                    break;
                }
            }
        }
    }

    evict_relay_client(&state, conn).await;
    state.connections.deregister(conn);
    tracing::info!(%conn, "relay connection closed");
}

/// Dispatches one extracted relay block: either the session sub-protocol
/// or raw game traffic to fan out.
async fn handle_relay_frames(
    state: &Arc<ServerState>,
    conn: ConnectionId,
    frames: Vec<u8>,
) {
    if frames.len() >= 2 && frames[0] == 0x82 && frames[1] == 0x02 {
        match parlor_protocol::decode(&frames) {
            Ok((packet, _)) if packet.command == commands::GSLOGIN => {
                if !relay_session_check(state, conn, &packet).await {
                    tracing::warn!(%conn, "relay session check failed");
                    state.connections.close(conn);
                }
            }
            Ok((packet, _)) => {
                tracing::debug!(
                    %conn,
                    command = %commands::name(packet.command),
                    "unexpected relay sub-protocol command, ignoring"
                );
            }
            Err(err) => {
                tracing::debug!(%conn, %err, "undecodable relay frame, ignoring");
            }
        }
        return;
    }

    // Raw game traffic: any frame marks the sender alive and is
    // broadcast verbatim to its game session.
    let Some(game_number) = state.relay_roster.mark_alive(conn) else {
        tracing::debug!(%conn, "relay frame before login, dropping");
        return;
    };
    for target in state.relay_roster.targets(game_number, conn) {
        state.send_raw(target, frames.clone());
    }
}

/// Resolves the relay login answer to an already-known game number.
async fn relay_session_check(
    state: &Arc<ServerState>,
    conn: ConnectionId,
    packet: &Packet,
) -> bool {
    let key = match derive_session_key(packet.sequence_id, &packet.payload) {
        Ok(key) => key,
        Err(err) => {
            tracing::debug!(%conn, %err, "malformed relay login");
            return false;
        }
    };

    let user = match state.store.user_for_session(&key).await {
        Ok(Some(user)) => user,
        Ok(None) => return false,
        Err(err) => {
            tracing::warn!(%conn, %err, "store failure on relay login");
            return false;
        }
    };

    let game_number = match state.store.game_number(&user).await {
        Ok(n) => n,
        Err(err) => {
            tracing::warn!(%conn, %user, %err, "store failure reading game number");
            return false;
        }
    };

    let evicted = state.relay_roster.add(RelayClient {
        conn,
        user: user.clone(),
        game_number,
        alive: true,
    });
    for old in evicted {
        tracing::debug!(conn = %old.conn, user = %old.user, "evicting relay duplicate");
        state.connections.close(old.conn);
    }

    if let Err(err) = state
        .store
        .update_origin(&user, OnlineStatus::Game, 0, 0, 0)
        .await
    {
        tracing::warn!(%user, %err, "store failure persisting relay origin");
    }

    tracing::info!(%conn, %user, game_number, "relay session established");
    true
}

/// Removes a relay client and records it offline. Lobby state is left
/// alone on purpose.
async fn evict_relay_client(state: &Arc<ServerState>, conn: ConnectionId) {
    let Some(client) = state.relay_roster.remove(conn) else {
        return;
    };
    if let Err(err) = state
        .store
        .update_origin(&client.user, OnlineStatus::Offline, -1, 0, 0)
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure on relay eviction");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay_client(conn: u64, user: &str, game: u32) -> RelayClient {
        RelayClient {
            conn: ConnectionId::new(conn),
            user: UserId(user.to_string()),
            game_number: game,
            alive: true,
        }
    }

    #[test]
    fn test_add_evicts_same_user() {
        let roster = RelayRoster::new();
        roster.add(relay_client(1, "a", 5));
        let evicted = roster.add(relay_client(2, "a", 5));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].conn, ConnectionId::new(1));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_targets_share_game_but_exclude_sender() {
        let roster = RelayRoster::new();
        roster.add(relay_client(1, "a", 5));
        roster.add(relay_client(2, "b", 5));
        roster.add(relay_client(3, "c", 6));

        let targets = roster.targets(5, ConnectionId::new(1));
        assert_eq!(targets, vec![ConnectionId::new(2)]);
    }

    #[test]
    fn test_mark_alive_returns_game_number() {
        let roster = RelayRoster::new();
        roster.add(relay_client(1, "a", 7));
        assert_eq!(roster.mark_alive(ConnectionId::new(1)), Some(7));
        assert_eq!(roster.mark_alive(ConnectionId::new(9)), None);
    }

    #[test]
    fn test_sweep_liveness_two_cycle_eviction() {
        let roster = RelayRoster::new();
        roster.add(relay_client(1, "a", 5));
        roster.add(relay_client(2, "b", 5));

        // First cycle: everyone was alive, nobody evicted.
        assert!(roster.sweep_liveness().is_empty());

        // Only client 2 sends traffic before the next cycle.
        roster.mark_alive(ConnectionId::new(2));
        let evicted = roster.sweep_liveness();
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].conn, ConnectionId::new(1));
        assert_eq!(roster.len(), 1);
    }
}
