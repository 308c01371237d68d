//! Error types for the protocol layer.

/// Errors that can occur while decoding or transforming packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The input ended before a full header or payload was available.
    #[error("truncated frame: needed {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    /// The direction byte is not one of the four known values.
    #[error("unknown direction byte 0x{0:02X}")]
    UnknownDirection(u8),

    /// The kind byte is not query, answer, or broadcast.
    #[error("unknown kind byte 0x{0:02X}")]
    UnknownKind(u8),

    /// A length-prefixed field points outside the payload.
    #[error("field out of bounds: offset {offset}, length {len}, payload {payload_len}")]
    FieldOutOfBounds {
        offset: usize,
        len: usize,
        payload_len: usize,
    },
}
