//! Encoding and decoding of the fixed 12-byte header wire format.
//!
//! Layout (all multi-byte fields big-endian):
//!
//! ```text
//! offset  0: direction        (1 byte)
//! offset  1: kind             (1 byte)
//! offset  2: command          (2 bytes)
//! offset  4: payload length   (2 bytes)
//! offset  6: sequence id      (2 bytes)
//! offset  8: error flag       (1 byte)
//! offset  9: reserved         (3 bytes, written 0xFF, ignored on read)
//! offset 12: payload          (payload length bytes)
//! ```

use bytes::{Buf, BufMut};

use crate::{Packet, ProtocolError};

/// Size of the fixed packet header.
pub const HEADER_LEN: usize = 12;

/// Byte offset of the payload-length field within the header.
pub const LEN_OFFSET: usize = 4;

/// Serializes a packet into its wire representation.
pub fn encode(p: &Packet) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + p.payload.len());
    out.put_u8(p.direction.as_byte());
    out.put_u8(p.kind.as_byte());
    out.put_u16(p.command);
    out.put_u16(p.payload.len() as u16);
    out.put_u16(p.sequence_id);
    out.put_u8(u8::from(p.error));
    out.put_slice(&[0xFF, 0xFF, 0xFF]);
    out.put_slice(&p.payload);
    out
}

/// Decodes a single packet from the start of `data`.
///
/// `data` must hold the complete frame (header plus payload). Returns the
/// packet and the number of bytes consumed.
///
/// # Errors
/// [`ProtocolError::Truncated`] when the header or payload is incomplete,
/// [`ProtocolError::UnknownDirection`]/[`ProtocolError::UnknownKind`] for
/// unrecognized header bytes.
pub fn decode(data: &[u8]) -> Result<(Packet, usize), ProtocolError> {
    if data.len() < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            needed: HEADER_LEN,
            got: data.len(),
        });
    }

    let mut header = &data[..HEADER_LEN];
    let direction = header.get_u8().try_into()?;
    let kind = header.get_u8().try_into()?;
    let command = header.get_u16();
    let payload_len = header.get_u16() as usize;
    let sequence_id = header.get_u16();
    let error = header.get_u8() != 0;
    // Remaining three reserved bytes are ignored.

    let total = HEADER_LEN + payload_len;
    if data.len() < total {
        return Err(ProtocolError::Truncated {
            needed: total,
            got: data.len(),
        });
    }

    let packet = Packet {
        direction,
        kind,
        command,
        sequence_id,
        error,
        payload: data[HEADER_LEN..total].to_vec(),
    };
    Ok((packet, total))
}

/// Splits a run of back-to-back complete frames into packets.
///
/// The reassembler hands back concatenated complete frames; this re-splits
/// them in order. Fails if the run ends mid-frame.
pub fn decode_run(mut data: &[u8]) -> Result<Vec<Packet>, ProtocolError> {
    let mut packets = Vec::new();
    while !data.is_empty() {
        let (packet, consumed) = decode(data)?;
        packets.push(packet);
        data = &data[consumed..];
    }
    Ok(packets)
}
