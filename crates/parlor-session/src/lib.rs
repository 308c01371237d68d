//! Session and identity layer for Parlor.
//!
//! This crate covers everything between "a socket connected" and "we know
//! which user this is":
//!
//! 1. **Key derivation** — the seed-subtraction scheme that turns the two
//!    5-digit login fields into a session key ([`derive_session_key`]).
//! 2. **The store boundary** — the [`SessionStore`] trait describing the
//!    external account store, called synchronously from handlers.
//! 3. **Presence** — [`OnlineStatus`] as persisted alongside the lobby
//!    coordinates.
//!
//! The server holds the store as `Arc<dyn SessionStore>`; production wires
//! a database client behind it, tests use [`MemoryStore`].

mod error;
mod key;
mod store;

pub use error::SessionError;
pub use key::{OnlineStatus, UserId, derive_session_key, encode_session_fields};
pub use store::{MemoryStore, SessionStore, StoredPair};
