//! Error types for the lobby data model.

/// Errors that can occur addressing the lobby hierarchy.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The coordinates point outside the slot grid.
    #[error("no such slot: area {area} room {room} slot {slot}")]
    NoSuchSlot { area: u16, room: u16, slot: u16 },
}
