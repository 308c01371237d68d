//! The shift-XOR obfuscation transform for embedded payload fields.
//!
//! Chosen handles, nicknames, chat text, passwords, event payloads and the
//! character-statistics block arrive XORed with a keystream derived from two
//! fixed 8-entry tables and the low byte of the packet's sequence id. The
//! transform is an involution: applying it twice with the same sequence id
//! restores the original bytes, so one routine serves both directions.
//!
//! Obfuscated fields come in two shapes:
//!
//! - **Length-prefixed**: a clear 2-byte prefix holding `len + 2`, a 2-byte
//!   checksum slot that is skipped, then `len` obfuscated bytes. Composite
//!   fields (handle+nickname, recipient+message) chain two of these.
//! - **Fixed-width**: no prefix; the byte count is known from the command.

use crate::ProtocolError;

const FIXVAL: [u8; 8] = [21, 23, 10, 17, 23, 19, 6, 13];
const MASKS: [u8; 8] = [0x33, 0x30, 0x3C, 0x34, 0x2D, 0x30, 0x3C, 0x34];

/// Computes one keystream byte for position `i` under sequence-id low
/// byte `pid`. Positions wrap at 256, matching the byte arithmetic of the
/// wire format.
pub fn keystream(i: usize, pid: u8) -> u8 {
    let i = (i & 0xFF) as u8;
    let idx = (i & 7) as usize;
    FIXVAL[idx]
        .wrapping_sub(i & 0xF8)
        .wrapping_sub(pid)
        .wrapping_add((pid.wrapping_sub(9).wrapping_add(i) & MASKS[idx]).wrapping_mul(2))
}

/// XORs `buf` in place with the keystream for `sequence_id`, starting the
/// keystream at position zero.
pub fn apply_keystream(buf: &mut [u8], sequence_id: u16) {
    let pid = (sequence_id & 0xFF) as u8;
    for (i, b) in buf.iter_mut().enumerate() {
        *b ^= keystream(i, pid);
    }
}

/// Decrypts one length-prefixed field located at `offset` in `payload`.
///
/// Returns the cleartext and the offset where a chained field would begin
/// (`offset + 4 + len`).
///
/// # Errors
/// [`ProtocolError::FieldOutOfBounds`] when the prefix or data runs past
/// the payload.
pub fn decrypt_field(
    payload: &[u8],
    offset: usize,
    sequence_id: u16,
) -> Result<(Vec<u8>, usize), ProtocolError> {
    if offset + 2 > payload.len() {
        return Err(ProtocolError::FieldOutOfBounds {
            offset,
            len: 2,
            payload_len: payload.len(),
        });
    }
    let prefixed =
        u16::from_be_bytes([payload[offset], payload[offset + 1]]) as usize;
    // The prefix counts the two checksum bytes that precede the data.
    let len = prefixed.saturating_sub(2);
    let start = offset + 4;
    if start + len > payload.len() {
        return Err(ProtocolError::FieldOutOfBounds {
            offset: start,
            len,
            payload_len: payload.len(),
        });
    }

    let mut data = payload[start..start + len].to_vec();
    apply_keystream(&mut data, sequence_id);
    Ok((data, start + len))
}

/// Decrypts the single length-prefixed field at the start of the payload.
pub fn decrypt_string(
    payload: &[u8],
    sequence_id: u16,
) -> Result<Vec<u8>, ProtocolError> {
    decrypt_field(payload, 0, sequence_id).map(|(data, _)| data)
}

/// Decrypts two back-to-back length-prefixed fields (handle+nickname,
/// recipient+message, sender+event).
pub fn decrypt_pair(
    payload: &[u8],
    sequence_id: u16,
) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
    let (first, next) = decrypt_field(payload, 0, sequence_id)?;
    let (second, _) = decrypt_field(payload, next, sequence_id)?;
    Ok((first, second))
}

/// Decrypts `len` bytes at `offset` without a length prefix, for fields
/// whose width is fixed by the command (the character-statistics block).
pub fn decrypt_fixed(
    payload: &[u8],
    offset: usize,
    len: usize,
    sequence_id: u16,
) -> Result<Vec<u8>, ProtocolError> {
    if offset + len > payload.len() {
        return Err(ProtocolError::FieldOutOfBounds {
            offset,
            len,
            payload_len: payload.len(),
        });
    }
    let mut data = payload[offset..offset + len].to_vec();
    apply_keystream(&mut data, sequence_id);
    Ok(data)
}

/// Builds an obfuscated length-prefixed field as a client would send it:
/// `[len+2:2][00 00][data XOR keystream]`. The inverse of
/// [`decrypt_string`]; used by tests and tooling, the server itself sends
/// its fields in the clear.
pub fn encrypt_field(cleartext: &[u8], sequence_id: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(cleartext.len() + 4);
    out.extend_from_slice(&((cleartext.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&[0x00, 0x00]);
    let start = out.len();
    out.extend_from_slice(cleartext);
    apply_keystream(&mut out[start..], sequence_id);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keystream_reference_vectors() {
        // Pinned against the table formula; a change here breaks every
        // deployed client.
        assert_eq!(keystream(0, 0), 123);
        assert_eq!(keystream(1, 0), 119);
        assert_eq!(keystream(0, 9), 12);
    }

    #[test]
    fn test_keystream_wraps_at_256() {
        assert_eq!(keystream(256, 0x5A), keystream(0, 0x5A));
        assert_eq!(keystream(257, 0x5A), keystream(1, 0x5A));
    }

    #[test]
    fn test_apply_keystream_is_involution() {
        for sequence_id in [0u16, 1, 0x00FF, 0x1234, 0xFFFF] {
            let original: Vec<u8> = (0..=255).collect();
            let mut buf = original.clone();
            apply_keystream(&mut buf, sequence_id);
            assert_ne!(buf, original, "keystream must actually change bytes");
            apply_keystream(&mut buf, sequence_id);
            assert_eq!(buf, original);
        }
    }

    #[test]
    fn test_keystream_depends_only_on_pid_low_byte() {
        let mut a = vec![0x41; 16];
        let mut b = vec![0x41; 16];
        apply_keystream(&mut a, 0x0142);
        apply_keystream(&mut b, 0xFF42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_decrypt_string_round_trip() {
        let field = encrypt_field(b"RESIDENT", 0x0007);
        let clear = decrypt_string(&field, 0x0007).unwrap();
        assert_eq!(clear, b"RESIDENT");
    }

    #[test]
    fn test_decrypt_pair_chains_two_fields() {
        let mut payload = encrypt_field(b"HANDLE", 33);
        payload.extend(encrypt_field(b"nickname bytes", 33));
        let (handle, nick) = decrypt_pair(&payload, 33).unwrap();
        assert_eq!(handle, b"HANDLE");
        assert_eq!(nick, b"nickname bytes");
    }

    #[test]
    fn test_decrypt_field_reports_chain_offset() {
        let payload = encrypt_field(b"abc", 1);
        let (_, next) = decrypt_field(&payload, 0, 1).unwrap();
        assert_eq!(next, 4 + 3);
    }

    #[test]
    fn test_decrypt_string_out_of_bounds_rejected() {
        // Prefix claims 30 data bytes but only 4 follow.
        let mut payload = vec![0x00, 0x20, 0x00, 0x00];
        payload.extend_from_slice(&[1, 2, 3, 4]);
        assert!(matches!(
            decrypt_string(&payload, 0),
            Err(ProtocolError::FieldOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_decrypt_fixed_round_trip() {
        let stats = [0xA5u8; 208];
        let mut wire = stats.to_vec();
        apply_keystream(&mut wire, 900);
        let clear = decrypt_fixed(&wire, 0, 208, 900).unwrap();
        assert_eq!(clear, stats);
    }

    #[test]
    fn test_decrypt_fixed_out_of_bounds_rejected() {
        assert!(decrypt_fixed(&[0u8; 8], 4, 8, 0).is_err());
    }
}
