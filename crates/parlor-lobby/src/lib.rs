//! Lobby data model for Parlor.
//!
//! Two owning structures back the whole server:
//!
//! - [`ClientDirectory`] — the authoritative set of connected clients,
//!   with the lookups and occupancy counts the dispatcher leans on.
//! - [`Lobby`] — the static area → room topology and the mutable slot
//!   grid ([`Slot`] + [`RuleSet`]).
//!
//! Both are constructed once at startup and guarded by one coarse lock
//! each in the server; nothing in this crate locks or blocks.

mod client;
mod directory;
mod error;
mod hierarchy;
mod hnpair;
mod rules;
mod slot;

pub use client::{AGL_AREA, Client, STATS_LEN};
pub use directory::{AreaCounts, ClientDirectory, HandleStatus};
pub use error::LobbyError;
pub use hierarchy::{
    Area, Areas, Lobby, ROOMS_PER_AREA, Rooms, SLOTS_PER_ROOM, STATUS_ACTIVE,
    STATUS_INACTIVE,
};
pub use hnpair::{
    HANDLE_LEN, HnPair, WILDCARD_HANDLE, pair_list_wire, random_handle,
};
pub use rules::{
    RULE_DIFFICULTY, RULE_FRIENDLY_FIRE, RULE_PLAYERS, RULE_WAIT, Rule,
    RuleSet,
};
pub use slot::{MEDIA_NOT_SET, SCENARIO_TRAINING, Slot, SlotStatus};
