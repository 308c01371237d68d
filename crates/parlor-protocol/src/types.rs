//! Core wire types: packet header fields and the `Packet` itself.
//!
//! Every frame on the lobby and relay links starts with the same 12-byte
//! header: direction, kind, command, payload length, sequence id, error
//! flag, and three reserved bytes written as `0xFF`. The payload follows
//! immediately and its length is known before the header is complete.

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Who put the frame on the wire.
///
/// The relay link reuses the same header layout with its own pair of
/// direction bytes, so both servers share one packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    /// Lobby server → client.
    FromServer = 0x18,
    /// Client → lobby server.
    FromClient = 0x81,
    /// Relay server → client.
    FromRelayServer = 0x28,
    /// Client → relay server.
    FromRelayClient = 0x82,
}

impl Direction {
    /// Returns the wire byte for this direction.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Direction {
    type Error = ProtocolError;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        match b {
            0x18 => Ok(Self::FromServer),
            0x81 => Ok(Self::FromClient),
            0x28 => Ok(Self::FromRelayServer),
            0x82 => Ok(Self::FromRelayClient),
            other => Err(ProtocolError::UnknownDirection(other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FromServer => "server",
            Self::FromClient => "client",
            Self::FromRelayServer => "relay-server",
            Self::FromRelayClient => "relay-client",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// Whether the frame asks, answers, or announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    /// A question; the peer echoes the sequence id in its answer.
    Query = 0x01,
    /// An answer to a query, carrying the query's sequence id.
    Answer = 0x02,
    /// Unsolicited one-to-many traffic.
    Broadcast = 0x10,
}

impl Kind {
    /// Returns the wire byte for this kind.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Kind {
    type Error = ProtocolError;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        match b {
            0x01 => Ok(Self::Query),
            0x02 => Ok(Self::Answer),
            0x10 => Ok(Self::Broadcast),
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Query => "query",
            Self::Answer => "answer",
            Self::Broadcast => "broadcast",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// One decoded protocol frame.
///
/// `sequence_id` originates from the sender's counter; answers echo the
/// query's id back. The error flag marks application-level rejections whose
/// payload is then a markup message for the client to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub direction: Direction,
    pub kind: Kind,
    pub command: u16,
    pub sequence_id: u16,
    pub error: bool,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Creates a packet with a payload.
    pub fn new(
        command: u16,
        kind: Kind,
        direction: Direction,
        sequence_id: u16,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            direction,
            kind,
            command,
            sequence_id,
            error: false,
            payload,
        }
    }

    /// Creates a payload-less packet.
    pub fn empty(
        command: u16,
        kind: Kind,
        direction: Direction,
        sequence_id: u16,
    ) -> Self {
        Self::new(command, kind, direction, sequence_id, Vec::new())
    }

    /// Sets the error flag, consuming and returning the packet.
    pub fn with_error(mut self) -> Self {
        self.error = true;
        self
    }

    /// Reads the first two payload bytes as a big-endian number.
    ///
    /// Most navigation queries (area select, enter room, slot queries)
    /// carry their target as this leading short. Returns 0 when the
    /// payload is shorter than two bytes.
    pub fn leading_number(&self) -> u16 {
        if self.payload.len() < 2 {
            return 0;
        }
        u16::from_be_bytes([self.payload[0], self.payload[1]])
    }
}

/// Encodes `text` as a length-prefixed field: `[len:2][bytes]`.
///
/// Server-originated message fields (join rejections, offline notices,
/// the cancel text) are sent in the clear in this form.
pub fn packet_string(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.extend_from_slice(&(text.len() as u16).to_be_bytes());
    out.extend_from_slice(text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trips_through_byte() {
        for d in [
            Direction::FromServer,
            Direction::FromClient,
            Direction::FromRelayServer,
            Direction::FromRelayClient,
        ] {
            assert_eq!(Direction::try_from(d.as_byte()).unwrap(), d);
        }
    }

    #[test]
    fn test_direction_unknown_byte_rejected() {
        assert!(matches!(
            Direction::try_from(0x00),
            Err(ProtocolError::UnknownDirection(0x00))
        ));
    }

    #[test]
    fn test_kind_unknown_byte_rejected() {
        assert!(matches!(
            Kind::try_from(0x42),
            Err(ProtocolError::UnknownKind(0x42))
        ));
    }

    #[test]
    fn test_leading_number_reads_big_endian_short() {
        let p = Packet::new(
            0x6207,
            Kind::Query,
            Direction::FromClient,
            7,
            vec![0x01, 0x02],
        );
        assert_eq!(p.leading_number(), 0x0102);
    }

    #[test]
    fn test_leading_number_short_payload_is_zero() {
        let p = Packet::empty(0x6207, Kind::Query, Direction::FromClient, 7);
        assert_eq!(p.leading_number(), 0);
    }

    #[test]
    fn test_packet_string_layout() {
        assert_eq!(
            packet_string(b"abc"),
            vec![0x00, 0x03, b'a', b'b', b'c']
        );
        assert_eq!(packet_string(b""), vec![0x00, 0x00]);
    }
}
