//! Server assembly: builder, listeners, and the task wiring.

use std::sync::Arc;

use parlor_session::SessionStore;
use parlor_tick::SweepConfig;
use parlor_transport::TcpAcceptor;
use tokio::sync::mpsc;

use crate::content::InfoPages;
use crate::error::ServerError;
use crate::handler::run_connection;
use crate::outbound::{self, Outbound};
use crate::relay::run_relay;
use crate::state::{RelayAdvert, ServerState};
use crate::sweep::run_sweeps;

/// Configuration supplied at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Lobby listener address.
    pub lobby_addr: String,
    /// Relay listener address.
    pub relay_addr: String,
    /// The relay address as advertised to clients (may differ from the
    /// bind address behind NAT).
    pub relay_advert: RelayAdvert,
    /// Content root for info pages.
    pub content_root: String,
    /// Maintenance cadences.
    pub sweeps: SweepConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            lobby_addr: "0.0.0.0:8300".into(),
            relay_addr: "0.0.0.0:8690".into(),
            relay_advert: RelayAdvert::default(),
            content_root: "htm".into(),
            sweeps: SweepConfig::default(),
        }
    }
}

/// The assembled server: lobby listener, relay listener, outbound
/// router, and the maintenance loop.
pub struct ParlorServer {
    state: Arc<ServerState>,
    outbound_rx: mpsc::Receiver<Outbound>,
    lobby: TcpAcceptor,
    relay: TcpAcceptor,
    sweeps: SweepConfig,
}

impl ParlorServer {
    /// Binds both listeners and builds the shared state.
    pub async fn bind(
        config: ServerConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ServerError> {
        let lobby = TcpAcceptor::bind(&config.lobby_addr).await?;
        let relay = TcpAcceptor::bind(&config.relay_addr).await?;
        let (state, outbound_rx) = ServerState::new(
            store,
            InfoPages::new(&config.content_root),
            config.relay_advert,
        );
        Ok(Self {
            state,
            outbound_rx,
            lobby,
            relay,
            sweeps: config.sweeps,
        })
    }

    /// The lobby listener's bound address.
    pub fn lobby_addr(&self) -> std::net::SocketAddr {
        self.lobby.local_addr()
    }

    /// The relay listener's bound address.
    pub fn relay_addr(&self) -> std::net::SocketAddr {
        self.relay.local_addr()
    }

    /// Runs every server task. Returns only if the lobby accept loop
    /// fails irrecoverably; individual connections never take the
    /// process down.
    pub async fn run(self) {
        let Self {
            state,
            outbound_rx,
            mut lobby,
            relay,
            sweeps,
        } = self;

        tokio::spawn(outbound::route_outbound(
            outbound_rx,
            Arc::clone(&state.connections),
        ));
        tokio::spawn(run_relay(Arc::clone(&state), relay));
        tokio::spawn(run_sweeps(Arc::clone(&state), sweeps));

        loop {
            match lobby.accept().await {
                Ok((stream, conn, peer)) => {
                    tracing::info!(%conn, %peer, "lobby connection");
                    let state = Arc::clone(&state);
                    tokio::spawn(run_connection(state, stream, conn));
                }
                Err(err) => {
                    tracing::warn!(%err, "lobby accept failed");
                }
            }
        }
    }
}
