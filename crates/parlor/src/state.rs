//! Shared server state and the primitives every handler uses.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use parlor_lobby::{ClientDirectory, Lobby};
use parlor_protocol::{Direction, Kind, Packet};
use parlor_session::SessionStore;
use parlor_transport::ConnectionId;
use tokio::sync::{Mutex, mpsc};

use crate::content::InfoPages;
use crate::outbound::{Connections, Outbound, OutboundQueue};
use crate::relay::RelayRoster;
use crate::scopes::Scope;

/// The relay address advertised to clients about to start a game.
#[derive(Debug, Clone, Copy)]
pub struct RelayAdvert {
    pub ip: [u8; 4],
    pub port: u16,
}

impl Default for RelayAdvert {
    fn default() -> Self {
        Self {
            ip: [127, 0, 0, 1],
            port: 8690,
        }
    }
}

/// Everything the dispatcher, sweeps, and relay share.
///
/// The two owned registries sit behind their own coarse locks; handlers
/// hold a lock only for a lookup or mutation, never across queue or
/// socket operations.
pub struct ServerState {
    pub directory: Mutex<ClientDirectory>,
    pub lobby: Mutex<Lobby>,
    pub store: Arc<dyn SessionStore>,
    pub connections: Arc<Connections>,
    pub relay_roster: Arc<RelayRoster>,
    pub info: InfoPages,
    pub relay_advert: RelayAdvert,
    outbound: OutboundQueue,
    packet_ids: AtomicU16,
    game_numbers: AtomicU32,
}

impl ServerState {
    /// Builds the shared state. The returned receiver feeds the outbound
    /// router ([`crate::outbound::route_outbound`]); tests may drain it
    /// directly instead.
    pub fn new(
        store: Arc<dyn SessionStore>,
        info: InfoPages,
        relay_advert: RelayAdvert,
    ) -> (Arc<Self>, mpsc::Receiver<Outbound>) {
        let (outbound, rx) = OutboundQueue::new();
        let state = Arc::new(Self {
            directory: Mutex::new(ClientDirectory::new()),
            lobby: Mutex::new(Lobby::new()),
            store,
            connections: Arc::new(Connections::new()),
            relay_roster: Arc::new(RelayRoster::new()),
            info,
            relay_advert,
            outbound,
            packet_ids: AtomicU16::new(0),
            game_numbers: AtomicU32::new(1),
        });
        (state, rx)
    }

    /// Next server-originated sequence id.
    pub fn next_packet_id(&self) -> u16 {
        self.packet_ids.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Next game-session number.
    pub fn next_game_number(&self) -> u32 {
        self.game_numbers.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Builds a server packet around a fresh sequence id.
    pub fn server_packet(
        &self,
        command: u16,
        kind: Kind,
        payload: Vec<u8>,
    ) -> Packet {
        Packet::new(
            command,
            kind,
            Direction::FromServer,
            self.next_packet_id(),
            payload,
        )
    }

    /// Builds a server answer that echoes the query's sequence id.
    pub fn answer(
        &self,
        query: &Packet,
        command: u16,
        payload: Vec<u8>,
    ) -> Packet {
        Packet::new(
            command,
            Kind::Answer,
            Direction::FromServer,
            query.sequence_id,
            payload,
        )
    }

    /// Enqueues a packet for one connection.
    pub fn send(&self, conn: ConnectionId, packet: &Packet) {
        self.outbound.enqueue(conn, packet);
    }

    /// Enqueues raw bytes for one connection (relay fan-out).
    pub fn send_raw(&self, conn: ConnectionId, bytes: Vec<u8>) {
        self.outbound.enqueue_raw(conn, bytes);
    }

    /// Enqueues `packet` for every directory client in `scope`.
    ///
    /// The directory lock is held only while collecting recipients.
    pub async fn broadcast(&self, scope: Scope, packet: &Packet) {
        let recipients: Vec<ConnectionId> = {
            let directory = self.directory.lock().await;
            directory
                .iter()
                .filter(|c| scope.matches(c))
                .map(|c| c.conn)
                .collect()
        };
        for conn in recipients {
            self.outbound.enqueue(conn, packet);
        }
    }

    /// Players currently on the relay link, tallied into several counts.
    pub fn in_game_count(&self) -> u16 {
        self.relay_roster.len() as u16
    }
}
