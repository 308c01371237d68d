//! Broadcast scopes: which clients observe a given outbound message.
//!
//! The dispatcher's correctness hinges on these predicates; every
//! broadcast names its scope explicitly instead of filtering inline.

use parlor_lobby::Client;

/// A dynamic subset of the connected clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Same area, not yet inside a room (browsing its room list).
    Area(u16),
    /// That area, or still on the area-selection screen.
    AreaOrSelect(u16),
    /// Same area and room, regardless of slot.
    Room(u16, u16),
    /// Same area, room, and slot.
    Slot(u16, u16, u16),
    /// Same area and room, in that slot or in no slot yet — slot
    /// attribute/status updates that room-browsers must also see.
    SlotOrBrowsing(u16, u16, u16),
    /// Same nonzero game number (after-game lobby and pre-game).
    ActiveGame(u32),
    /// The full directory.
    Everyone,
}

impl Scope {
    /// Whether `client` falls inside this scope.
    pub fn matches(&self, client: &Client) -> bool {
        match *self {
            Scope::Area(area) => client.area == area && client.room == 0,
            Scope::AreaOrSelect(area) => {
                client.area == area
                    || (client.area == 0 && client.room == 0)
            }
            Scope::Room(area, room) => {
                client.area == area && client.room == room
            }
            Scope::Slot(area, room, slot) => {
                client.area == area
                    && client.room == room
                    && client.slot == slot
            }
            Scope::SlotOrBrowsing(area, room, slot) => {
                client.area == area
                    && client.room == room
                    && (client.slot == slot || client.slot == 0)
            }
            Scope::ActiveGame(game) => {
                game > 0 && client.game_number == game
            }
            Scope::Everyone => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_session::UserId;
    use parlor_transport::ConnectionId;

    fn client(area: u16, room: u16, slot: u16, game: u32) -> Client {
        let mut c = Client::new(
            ConnectionId::new(1),
            UserId("u".into()),
            String::new(),
        );
        c.area = area;
        c.room = room;
        c.slot = slot;
        c.game_number = game;
        c
    }

    #[test]
    fn test_area_scope_excludes_clients_in_rooms() {
        let scope = Scope::Area(1);
        assert!(scope.matches(&client(1, 0, 0, 0)));
        assert!(!scope.matches(&client(1, 2, 0, 0)));
        assert!(!scope.matches(&client(2, 0, 0, 0)));
    }

    #[test]
    fn test_area_or_select_scope_includes_unselected() {
        let scope = Scope::AreaOrSelect(1);
        assert!(scope.matches(&client(1, 3, 0, 0)));
        assert!(scope.matches(&client(0, 0, 0, 0)));
        assert!(!scope.matches(&client(2, 0, 0, 0)));
    }

    #[test]
    fn test_room_scope_ignores_slot() {
        let scope = Scope::Room(1, 2);
        assert!(scope.matches(&client(1, 2, 0, 0)));
        assert!(scope.matches(&client(1, 2, 7, 0)));
        assert!(!scope.matches(&client(1, 3, 0, 0)));
    }

    #[test]
    fn test_slot_scope_requires_exact_slot() {
        let scope = Scope::Slot(1, 2, 3);
        assert!(scope.matches(&client(1, 2, 3, 0)));
        assert!(!scope.matches(&client(1, 2, 4, 0)));
        assert!(!scope.matches(&client(1, 2, 0, 0)));
    }

    #[test]
    fn test_slot_or_browsing_scope_includes_unslotted() {
        let scope = Scope::SlotOrBrowsing(1, 2, 3);
        assert!(scope.matches(&client(1, 2, 3, 0)));
        assert!(scope.matches(&client(1, 2, 0, 0)));
        assert!(!scope.matches(&client(1, 2, 4, 0)));
        assert!(!scope.matches(&client(1, 3, 0, 0)));
    }

    #[test]
    fn test_active_game_scope_requires_nonzero_game() {
        assert!(Scope::ActiveGame(7).matches(&client(51, 0, 0, 7)));
        assert!(!Scope::ActiveGame(7).matches(&client(51, 0, 0, 8)));
        assert!(!Scope::ActiveGame(0).matches(&client(51, 0, 0, 0)));
    }

    #[test]
    fn test_everyone_scope_matches_all() {
        assert!(Scope::Everyone.matches(&client(0, 0, 0, 0)));
        assert!(Scope::Everyone.matches(&client(51, 9, 9, 9)));
    }
}
