//! The authoritative set of currently-connected clients.
//!
//! Every query is an O(n) scan; the directory holds tens of entries and a
//! single lock, which keeps it simple and race-free. The directory owns
//! `Client` lifetimes exclusively — handlers borrow, never keep.

use parlor_session::UserId;
use parlor_transport::ConnectionId;

use crate::{AGL_AREA, Client};

/// Occupancy of one area, split the way area broadcasts report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AreaCounts {
    /// In the area but still browsing the room list.
    pub room_list: u16,
    /// Inside one of the area's rooms.
    pub in_room: u16,
    /// In the after-game lobby (tallied for every area query).
    pub after_game: u16,
}

/// Presence of a handle, for buddy queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    Offline,
    Online,
    InGame,
}

/// Mutable registry of connected clients.
#[derive(Default)]
pub struct ClientDirectory {
    clients: Vec<Client>,
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a client.
    ///
    /// Exactly one entry may exist per user identity and per connection;
    /// conflicting entries are evicted first and returned so the caller
    /// can close their connections.
    pub fn add(&mut self, client: Client) -> Vec<Client> {
        let mut evicted = Vec::new();
        let mut i = 0;
        while i < self.clients.len() {
            let existing = &self.clients[i];
            if existing.user == client.user || existing.conn == client.conn {
                tracing::debug!(
                    user = %existing.user,
                    conn = %existing.conn,
                    "evicting stale directory entry"
                );
                evicted.push(self.clients.remove(i));
            } else {
                i += 1;
            }
        }
        self.clients.push(client);
        evicted
    }

    /// Removes and returns the entry for `conn`.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<Client> {
        let idx = self.clients.iter().position(|c| c.conn == conn)?;
        Some(self.clients.remove(idx))
    }

    pub fn by_conn(&self, conn: ConnectionId) -> Option<&Client> {
        self.clients.iter().find(|c| c.conn == conn)
    }

    pub fn by_conn_mut(&mut self, conn: ConnectionId) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.conn == conn)
    }

    pub fn by_user(&self, user: &UserId) -> Option<&Client> {
        self.clients.iter().find(|c| &c.user == user)
    }

    pub fn by_handle(&self, handle: &[u8]) -> Option<&Client> {
        self.clients.iter().find(|c| {
            c.hn_pair
                .as_ref()
                .is_some_and(|p| p.handle == handle)
        })
    }

    /// Finds the occupant of a slot position by player number.
    pub fn by_position(
        &self,
        area: u16,
        room: u16,
        slot: u16,
        player: u8,
    ) -> Option<&Client> {
        self.clients.iter().find(|c| {
            c.area == area
                && c.room == room
                && c.slot == slot
                && c.player == player
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Client> {
        self.clients.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    // -- Aggregate queries used by the dispatcher ------------------------

    pub fn count_in_slot(&self, area: u16, room: u16, slot: u16) -> usize {
        self.clients
            .iter()
            .filter(|c| c.area == area && c.room == room && c.slot == slot)
            .count()
    }

    pub fn count_in_room(&self, area: u16, room: u16) -> usize {
        self.clients
            .iter()
            .filter(|c| c.area == area && c.room == room)
            .count()
    }

    pub fn count_in_area(&self, area: u16) -> AreaCounts {
        let mut counts = AreaCounts::default();
        for c in &self.clients {
            if c.area == area {
                if c.room == 0 {
                    counts.room_list += 1;
                } else {
                    counts.in_room += 1;
                }
            } else if c.area == AGL_AREA {
                counts.after_game += 1;
            }
        }
        counts
    }

    /// Lowest unused player number (2–4) in a slot; 1 is reserved for the
    /// creating host. Returns 0 when the slot is full.
    pub fn free_player_number(&self, area: u16, room: u16, slot: u16) -> u8 {
        let mut taken = [false; 5];
        for c in &self.clients {
            if c.area == area
                && c.room == room
                && c.slot == slot
                && usize::from(c.player) < taken.len()
            {
                taken[usize::from(c.player)] = true;
            }
        }
        (2..=4).find(|&n| !taken[usize::from(n)]).unwrap_or(0)
    }

    /// Clients sharing a game number in the after-game lobby.
    pub fn agl_count(&self, game_number: u32) -> u8 {
        self.clients
            .iter()
            .filter(|c| c.game_number == game_number)
            .count() as u8
    }

    /// The host occupying a slot, if one survives.
    pub fn host_of_slot(
        &self,
        area: u16,
        room: u16,
        slot: u16,
    ) -> Option<&Client> {
        self.clients.iter().find(|c| {
            c.area == area && c.room == room && c.slot == slot && c.host
        })
    }

    /// Presence of a handle for buddy queries.
    pub fn handle_status(&self, handle: &[u8]) -> HandleStatus {
        match self.by_handle(handle) {
            None => HandleStatus::Offline,
            Some(c) if c.game_number > 0 || c.area == AGL_AREA => {
                HandleStatus::InGame
            }
            Some(_) => HandleStatus::Online,
        }
    }

    /// Statistics block for every occupant of a slot:
    /// `[slot:2][03][count]` then each occupant's stat block.
    pub fn player_stats_block(
        &self,
        area: u16,
        room: u16,
        slot: u16,
    ) -> Vec<u8> {
        let occupants: Vec<&Client> = self
            .clients
            .iter()
            .filter(|c| c.area == area && c.room == room && c.slot == slot)
            .collect();

        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(&slot.to_be_bytes());
        // Constant observed on the wire; meaning unknown.
        out.push(3);
        out.push(occupants.len() as u8);
        for c in occupants {
            out.extend_from_slice(&c.stat_block());
        }
        out
    }
}
