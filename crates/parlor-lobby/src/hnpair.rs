//! Handle/nickname pairs.
//!
//! A handle is a six-character player tag from a fixed alphabet; the
//! nickname is free text in a legacy double-byte encoding, carried as raw
//! bytes. A client requesting the wildcard handle `******` gets a
//! server-generated one instead.

use rand::Rng;

/// Length of every handle on the wire.
pub const HANDLE_LEN: usize = 6;

/// Handle value that requests server-side generation.
pub const WILDCARD_HANDLE: &[u8; HANDLE_LEN] = b"******";

/// Characters a generated handle is drawn from.
const HANDLE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A player-chosen handle plus display nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HnPair {
    pub handle: Vec<u8>,
    pub nickname: Vec<u8>,
}

impl HnPair {
    pub fn new(handle: &[u8], nickname: &[u8]) -> Self {
        Self {
            handle: handle.to_vec(),
            nickname: nickname.to_vec(),
        }
    }

    /// Whether the client asked the server to pick the handle.
    pub fn is_wildcard(&self) -> bool {
        self.handle == WILDCARD_HANDLE
    }

    /// The handle padded/truncated to its fixed wire width.
    pub fn handle_fixed(&self) -> [u8; HANDLE_LEN] {
        let mut out = [b' '; HANDLE_LEN];
        for (o, b) in out.iter_mut().zip(self.handle.iter()) {
            *o = *b;
        }
        out
    }

    /// Wire encoding: `[00 06][handle:6][00 nlen][nickname]`.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + HANDLE_LEN + self.nickname.len());
        out.extend_from_slice(&(HANDLE_LEN as u16).to_be_bytes());
        out.extend_from_slice(&self.handle_fixed());
        out.extend_from_slice(&(self.nickname.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.nickname);
        out
    }
}

/// Draws one candidate handle from the fixed alphabet. The caller retries
/// against the store until an unclaimed one comes up.
pub fn random_handle() -> Vec<u8> {
    let mut rng = rand::rng();
    (0..HANDLE_LEN)
        .map(|_| HANDLE_ALPHABET[rng.random_range(0..HANDLE_ALPHABET.len())])
        .collect()
}

/// Wire array of up to three stored pairs: a leading count byte, then each
/// pair's encoding followed by two zero end-marker bytes.
pub fn pair_list_wire(pairs: &[HnPair]) -> Vec<u8> {
    let pairs = &pairs[..pairs.len().min(3)];
    let mut out = vec![pairs.len() as u8];
    for pair in pairs {
        out.extend_from_slice(&pair.to_wire());
        out.extend_from_slice(&[0, 0]);
    }
    out
}
