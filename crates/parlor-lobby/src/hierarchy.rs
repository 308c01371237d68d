//! The static area → room topology and the slot grid.
//!
//! Areas and rooms are fixed at startup; only slots mutate. Handlers
//! address the grid with the raw numbers from the wire — some screens use
//! them 1-based, others 0-based — so the grid is sized to accept both and
//! every accessor degrades to a safe default out of range instead of
//! panicking.

use crate::{LobbyError, Slot};

/// Area/room status byte: selectable.
pub const STATUS_ACTIVE: u8 = 3;

/// Area/room status byte: locked.
pub const STATUS_INACTIVE: u8 = 0;

/// Rooms per area.
pub const ROOMS_PER_AREA: u16 = 10;

/// Slots per room.
pub const SLOTS_PER_ROOM: u16 = 20;

// ---------------------------------------------------------------------------
// Areas
// ---------------------------------------------------------------------------

/// One top-level lobby category.
#[derive(Debug, Clone)]
pub struct Area {
    pub name: &'static str,
    pub description: &'static str,
    pub status: u8,
}

/// The fixed area table. Lookup is 1-based, as the area screens query it.
#[derive(Debug, Clone)]
pub struct Areas {
    areas: Vec<Area>,
}

impl Areas {
    /// The two standard areas.
    pub fn standard() -> Self {
        Self {
            areas: vec![
                Area {
                    name: "East Town",
                    description: "<BODY><SIZE=3>standard rules<END>",
                    status: STATUS_ACTIVE,
                },
                Area {
                    name: "West Town",
                    description: "<BODY><SIZE=3>individual games<END>",
                    status: STATUS_ACTIVE,
                },
            ],
        }
    }

    pub fn count(&self) -> u16 {
        self.areas.len() as u16
    }

    fn get(&self, number: u16) -> Option<&Area> {
        if number == 0 {
            return None;
        }
        self.areas.get(usize::from(number) - 1)
    }

    pub fn name(&self, number: u16) -> &str {
        self.get(number).map(|a| a.name).unwrap_or("")
    }

    pub fn description(&self, number: u16) -> &str {
        self.get(number).map(|a| a.description).unwrap_or("")
    }

    pub fn status(&self, number: u16) -> u8 {
        self.get(number).map(|a| a.status).unwrap_or(STATUS_INACTIVE)
    }
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// The fixed per-area room table: "R1"…"RA", all active.
#[derive(Debug, Clone)]
pub struct Rooms {
    names: Vec<&'static str>,
}

impl Rooms {
    pub fn standard() -> Self {
        Self {
            names: vec![
                "R1", "R2", "R3", "R4", "R5", "R6", "R7", "R8", "R9", "RA",
            ],
        }
    }

    /// Rooms per area, as answered to the room-count query.
    pub fn count(&self) -> u16 {
        self.names.len() as u16
    }

    /// Room name; lookup is 1-based.
    pub fn name(&self, _area: u16, room: u16) -> &str {
        if room == 0 {
            return "";
        }
        self.names.get(usize::from(room) - 1).copied().unwrap_or("")
    }

    pub fn status(&self, _area: u16, room: u16) -> u8 {
        if room >= 1 && room <= self.count() {
            STATUS_ACTIVE
        } else {
            STATUS_INACTIVE
        }
    }
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

/// The whole hierarchy: static areas/rooms plus the mutable slot grid.
pub struct Lobby {
    areas: Areas,
    rooms: Rooms,
    /// Dense grid indexed `[area][room][slot]`, inclusive of index 0 on
    /// every axis so both indexing conventions land in bounds.
    slots: Vec<Slot>,
    area_dim: usize,
    room_dim: usize,
    slot_dim: usize,
}

impl Lobby {
    pub fn new() -> Self {
        let areas = Areas::standard();
        let rooms = Rooms::standard();
        let area_dim = usize::from(areas.count()) + 1;
        let room_dim = usize::from(ROOMS_PER_AREA) + 1;
        let slot_dim = usize::from(SLOTS_PER_ROOM) + 1;

        let mut slots =
            Vec::with_capacity(area_dim * room_dim * slot_dim);
        for area in 0..area_dim {
            for room in 0..room_dim {
                for slot in 0..slot_dim {
                    slots.push(Slot::new(
                        area as u16,
                        room as u16,
                        slot as u16,
                    ));
                }
            }
        }

        Self {
            areas,
            rooms,
            slots,
            area_dim,
            room_dim,
            slot_dim,
        }
    }

    pub fn areas(&self) -> &Areas {
        &self.areas
    }

    pub fn rooms(&self) -> &Rooms {
        &self.rooms
    }

    pub fn slot_count(&self) -> u16 {
        SLOTS_PER_ROOM
    }

    fn index(&self, area: u16, room: u16, slot: u16) -> Option<usize> {
        let (a, r, s) =
            (usize::from(area), usize::from(room), usize::from(slot));
        if a >= self.area_dim || r >= self.room_dim || s >= self.slot_dim {
            return None;
        }
        Some((a * self.room_dim + r) * self.slot_dim + s)
    }

    /// Immutable slot access; out-of-range coordinates yield `None`.
    pub fn slot(&self, area: u16, room: u16, slot: u16) -> Option<&Slot> {
        self.index(area, room, slot).map(|i| &self.slots[i])
    }

    /// Mutable slot access for handlers that reconfigure a slot.
    pub fn slot_mut(
        &mut self,
        area: u16,
        room: u16,
        slot: u16,
    ) -> Result<&mut Slot, LobbyError> {
        match self.index(area, room, slot) {
            Some(i) => Ok(&mut self.slots[i]),
            None => Err(LobbyError::NoSuchSlot { area, room, slot }),
        }
    }

    /// Iterates 1-based `(area, room, slot)` coordinates of the real grid,
    /// for maintenance sweeps.
    pub fn coordinates(
        &self,
    ) -> impl Iterator<Item = (u16, u16, u16)> + use<> {
        let areas = self.areas.count();
        (1..=areas).flat_map(|a| {
            (1..=ROOMS_PER_AREA).flat_map(move |r| {
                (1..=SLOTS_PER_ROOM).map(move |s| (a, r, s))
            })
        })
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlotStatus;

    #[test]
    fn test_standard_areas() {
        let areas = Areas::standard();
        assert_eq!(areas.count(), 2);
        assert_eq!(areas.name(1), "East Town");
        assert_eq!(areas.name(2), "West Town");
        assert_eq!(areas.status(1), STATUS_ACTIVE);
    }

    #[test]
    fn test_area_lookup_out_of_range_is_default() {
        let areas = Areas::standard();
        assert_eq!(areas.name(0), "");
        assert_eq!(areas.name(3), "");
        assert_eq!(areas.status(99), STATUS_INACTIVE);
    }

    #[test]
    fn test_standard_rooms() {
        let rooms = Rooms::standard();
        assert_eq!(rooms.count(), 10);
        assert_eq!(rooms.name(1, 1), "R1");
        assert_eq!(rooms.name(1, 10), "RA");
        assert_eq!(rooms.name(1, 0), "");
        assert_eq!(rooms.status(1, 5), STATUS_ACTIVE);
        assert_eq!(rooms.status(1, 11), STATUS_INACTIVE);
    }

    #[test]
    fn test_lobby_slot_access_both_conventions() {
        let lobby = Lobby::new();
        // 1-based extremes of the real grid.
        assert!(lobby.slot(1, 1, 1).is_some());
        assert!(lobby.slot(2, 10, 20).is_some());
        // 0-based accesses stay in bounds too.
        assert!(lobby.slot(0, 0, 0).is_some());
    }

    #[test]
    fn test_lobby_slot_out_of_range_is_safe() {
        let mut lobby = Lobby::new();
        assert!(lobby.slot(3, 1, 1).is_none());
        assert!(lobby.slot(1, 11, 1).is_none());
        assert!(lobby.slot(1, 1, 21).is_none());
        assert!(lobby.slot_mut(51, 0, 0).is_err());
    }

    #[test]
    fn test_slot_mutation_sticks() {
        let mut lobby = Lobby::new();
        lobby
            .slot_mut(1, 2, 3)
            .unwrap()
            .set_status(SlotStatus::Busy);
        assert_eq!(
            lobby.slot(1, 2, 3).unwrap().status(),
            SlotStatus::Busy
        );
        // Neighbours untouched.
        assert_eq!(
            lobby.slot(1, 2, 4).unwrap().status(),
            SlotStatus::Free
        );
    }

    #[test]
    fn test_coordinates_cover_real_grid() {
        let lobby = Lobby::new();
        let coords: Vec<_> = lobby.coordinates().collect();
        assert_eq!(coords.len(), 2 * 10 * 20);
        assert_eq!(coords[0], (1, 1, 1));
        assert_eq!(*coords.last().unwrap(), (2, 10, 20));
    }
}
