//! Wire protocol for Parlor.
//!
//! The lobby and relay servers speak the same proprietary binary framing:
//! a fixed 12-byte header followed by a payload whose embedded string
//! fields are obfuscated with a shift-XOR keystream.
//!
//! - **Types** ([`Packet`], [`Direction`], [`Kind`]) — the decoded frame.
//! - **Codec** ([`codec`]) — header layout, encode/decode, run splitting.
//! - **Crypt** ([`crypt`]) — the obfuscation transform and field readers.
//! - **Commands** ([`commands`]) — command-id constants and diagnostic names.
//!
//! The protocol layer knows nothing about connections or the lobby
//! hierarchy; it only turns bytes into packets and back.

mod error;
mod types;

pub mod codec;
pub mod commands;
pub mod crypt;

pub use codec::{HEADER_LEN, decode, decode_run, encode};
pub use error::ProtocolError;
pub use types::{Direction, Kind, Packet, packet_string};
