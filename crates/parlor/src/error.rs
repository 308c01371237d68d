//! Unified error type for the Parlor servers.

use parlor_lobby::LobbyError;
use parlor_protocol::ProtocolError;
use parlor_session::SessionError;
use parlor_transport::TransportError;

/// Top-level error wrapping the crate-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level error (bind, accept, reassembly).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (framing, field decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (key derivation, store access).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A lobby data-model error (grid addressing).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// Raw socket I/O failure on a connection.
    #[error("connection i/o: {0}")]
    Io(#[from] std::io::Error),
}
