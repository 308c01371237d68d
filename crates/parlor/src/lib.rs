//! # Parlor
//!
//! Lobby/matchmaking server for a console multiplayer game, plus the
//! companion relay that bridges in-game traffic between the players of
//! one session.
//!
//! The layering, bottom up:
//!
//! - `parlor-transport` — TCP accept loop and stream reassembly
//! - `parlor-protocol` — the 12-byte-header framing and obfuscation
//! - `parlor-session` — session keys and the persistent-store boundary
//! - `parlor-lobby` — the client directory and area/room/slot model
//! - `parlor-tick` — the maintenance sweep scheduler
//! - this crate — dispatcher, delivery pipeline, liveness loop, relay
//!
//! [`ParlorServer`] assembles the whole thing; the `parlord` binary is
//! the thin bootstrap around it.

mod actions;
mod broadcasts;
mod content;
mod dispatch;
mod error;
mod handler;
mod outbound;
mod relay;
mod scopes;
mod server;
mod state;
mod sweep;

pub use content::InfoPages;
pub use dispatch::dispatch;
pub use error::ServerError;
pub use outbound::{OUTBOUND_QUEUE_CAPACITY, Outbound};
pub use relay::{RelayClient, RelayRoster};
pub use scopes::Scope;
pub use server::{ParlorServer, ServerConfig};
pub use state::{RelayAdvert, ServerState};

// Exercised by the integration tests alongside the public dispatch
// surface.
pub use handler::run_connection;
pub use relay::run_relay_connection;
pub use sweep::run_sweeps;

#[doc(hidden)]
pub mod testing {
    //! Hooks for driving the server from integration tests without
    //! sockets: the login opener and the individual sweep bodies.

    pub use crate::dispatch::send_login_query;
    pub use crate::sweep::{
        broadcast_ping, check_auto_start, clean_ghost_slots, liveness_check,
    };
}
