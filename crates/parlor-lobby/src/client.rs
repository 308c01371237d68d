//! One authenticated connection's lobby-side state.

use parlor_session::UserId;
use parlor_transport::ConnectionId;

use crate::HnPair;

/// Pseudo-area id of the after-game lobby. Clients there are scoped by
/// game number, not by room/slot.
pub const AGL_AREA: u16 = 51;

/// Width of the character-statistics blob.
pub const STATS_LEN: usize = 208;

/// A connected, authenticated client.
///
/// Lobby position is plain data (`area`/`room`/`slot`/`player`); 0 means
/// unassigned. All legal transitions happen inside the dispatcher's
/// handlers. The client references its slot only by these coordinates,
/// never by holding the slot itself.
#[derive(Debug, Clone)]
pub struct Client {
    pub conn: ConnectionId,
    pub user: UserId,
    pub session_key: String,
    pub hn_pair: Option<HnPair>,
    pub character: i16,
    pub costume: i16,
    /// Raw decrypted character-statistics blob.
    pub stats: Vec<u8>,
    pub area: u16,
    pub room: u16,
    pub slot: u16,
    /// Player number within a slot, 1–4; 1 is the creating host.
    pub player: u8,
    pub host: bool,
    /// Current game session, 0 = none.
    pub game_number: u32,
    /// Cleared before each liveness sweep, set back by the client's
    /// answer.
    pub alive: bool,
}

impl Client {
    pub fn new(conn: ConnectionId, user: UserId, session_key: String) -> Self {
        Self {
            conn,
            user,
            session_key,
            hn_pair: None,
            character: 0,
            costume: 0,
            stats: Vec::new(),
            area: 0,
            room: 0,
            slot: 0,
            player: 0,
            host: false,
            game_number: 0,
            alive: true,
        }
    }

    /// The client's handle padded to wire width; spaces before a pair is
    /// chosen.
    pub fn handle_fixed(&self) -> [u8; 6] {
        self.hn_pair
            .as_ref()
            .map(|p| p.handle_fixed())
            .unwrap_or([b' '; 6])
    }

    /// Statistics block as broadcast to slots and the after-game lobby:
    /// the handle/nickname pair followed by the length-prefixed stats.
    pub fn stat_block(&self) -> Vec<u8> {
        let pair_wire = self
            .hn_pair
            .as_ref()
            .map(|p| p.to_wire())
            .unwrap_or_else(|| HnPair::new(b"      ", b"").to_wire());
        let mut out =
            Vec::with_capacity(pair_wire.len() + 2 + self.stats.len());
        out.extend_from_slice(&pair_wire);
        out.extend_from_slice(&(self.stats.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.stats);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(
            ConnectionId::new(1),
            UserId("user-1".into()),
            "12345678".into(),
        )
    }

    #[test]
    fn test_new_client_starts_unpositioned_and_alive() {
        let c = client();
        assert_eq!((c.area, c.room, c.slot, c.player), (0, 0, 0, 0));
        assert!(!c.host);
        assert_eq!(c.game_number, 0);
        assert!(c.alive);
    }

    #[test]
    fn test_handle_fixed_before_selection_is_spaces() {
        assert_eq!(&client().handle_fixed(), b"      ");
    }

    #[test]
    fn test_stat_block_layout() {
        let mut c = client();
        c.hn_pair = Some(HnPair::new(b"ABC123", b"nick"));
        c.stats = vec![0xEE; STATS_LEN];

        let block = c.stat_block();
        // Pair wire (4 + 6 + 4) + stats length prefix + stats.
        assert_eq!(block.len(), 14 + 2 + STATS_LEN);
        assert_eq!(&block[14..16], &(STATS_LEN as u16).to_be_bytes());
        assert_eq!(block[16], 0xEE);
    }
}
