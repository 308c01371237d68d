//! TCP accept loop wrapper.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};

use crate::{ConnectionId, TransportError};

/// Connection ids are drawn from one process-wide counter so ids from
/// different listeners (lobby and relay) never collide.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Wraps a [`TcpListener`] and tags every accepted stream with a fresh
/// [`ConnectionId`].
pub struct TcpAcceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpAcceptor {
    /// Binds a listener on `addr`.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        let local_addr =
            listener.local_addr().map_err(TransportError::BindFailed)?;
        tracing::info!(%local_addr, "listening");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The bound local address (useful when binding port 0 in tests).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the next connection.
    pub async fn accept(
        &mut self,
    ) -> Result<(TcpStream, ConnectionId, SocketAddr), TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(conn_id = %id, %peer, "accepted connection");
        Ok((stream, id, peer))
    }
}
