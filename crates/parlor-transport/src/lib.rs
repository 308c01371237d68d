//! Transport layer for Parlor: TCP accept loop and per-connection
//! byte-stream reassembly.
//!
//! This crate knows nothing about packet contents. It produces raw frame
//! runs from [`StreamBuffer`] and leaves decoding to the protocol layer.

mod error;
mod reassembly;
mod tcp;

pub use error::TransportError;
pub use reassembly::{RECEIVE_CAPACITY, StreamBuffer};
pub use tcp::TcpAcceptor;

use std::fmt;

/// Opaque identifier for a connection.
///
/// Connection ids are unique per listener for the lifetime of the process
/// and serve as the key between the client directory and the delivery
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "first");
        map.insert(ConnectionId::new(2), "second");
        assert_eq!(map[&ConnectionId::new(1)], "first");
    }
}
