//! The persistent-store interface and an in-memory implementation.
//!
//! The lobby core never talks to a database directly; it calls this trait
//! from inside dispatcher handlers. Every operation is fallible and every
//! caller degrades gracefully on failure (empty MOTD, no stored pairs,
//! session miss) rather than dropping the connection.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{OnlineStatus, SessionError, UserId};

/// A stored handle/nickname pair. The nickname stays in its legacy
/// double-byte encoding; the server never transcodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPair {
    pub handle: String,
    pub nickname: Vec<u8>,
}

/// Operations the lobby and relay servers need from the account store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolves a session key to a user identity, `None` on a miss.
    async fn user_for_session(
        &self,
        session_key: &str,
    ) -> Result<Option<UserId>, SessionError>;

    /// Whether `handle` is still unclaimed.
    async fn handle_available(&self, handle: &str)
    -> Result<bool, SessionError>;

    /// Records a freshly generated handle/nickname pair for `user`.
    async fn insert_pair(
        &self,
        user: &UserId,
        pair: &StoredPair,
    ) -> Result<(), SessionError>;

    /// Refreshes the nickname of an existing pair.
    async fn update_pair(
        &self,
        user: &UserId,
        pair: &StoredPair,
    ) -> Result<(), SessionError>;

    /// Persists a user's presence and lobby coordinates. `area` is `-1`
    /// when going offline.
    async fn update_origin(
        &self,
        user: &UserId,
        status: OnlineStatus,
        area: i32,
        room: u16,
        slot: u16,
    ) -> Result<(), SessionError>;

    /// Persists a user's current game number (0 = none).
    async fn update_game_number(
        &self,
        user: &UserId,
        game_number: u32,
    ) -> Result<(), SessionError>;

    /// Fetches a user's current game number.
    async fn game_number(&self, user: &UserId) -> Result<u32, SessionError>;

    /// The active message of the day, `None` when unset.
    async fn motd(&self) -> Result<Option<String>, SessionError>;

    /// Up to three stored handle/nickname pairs for `user`.
    async fn stored_pairs(
        &self,
        user: &UserId,
    ) -> Result<Vec<StoredPair>, SessionError>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct UserRecord {
    pairs: Vec<StoredPair>,
    status: i32,
    area: i32,
    room: u16,
    slot: u16,
    game_number: u32,
}

#[derive(Default)]
struct MemoryInner {
    sessions: HashMap<String, UserId>,
    users: HashMap<UserId, UserRecord>,
    motd: Option<String>,
}

/// In-memory [`SessionStore`] for tests and development runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session key for a user.
    pub fn add_session(&self, session_key: &str, user: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .sessions
            .insert(session_key.to_string(), UserId(user.to_string()));
        inner.users.entry(UserId(user.to_string())).or_default();
    }

    pub fn set_motd(&self, motd: &str) {
        self.inner.lock().unwrap().motd = Some(motd.to_string());
    }

    pub fn add_pair(&self, user: &str, handle: &str, nickname: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .users
            .entry(UserId(user.to_string()))
            .or_default()
            .pairs
            .push(StoredPair {
                handle: handle.to_string(),
                nickname: nickname.to_vec(),
            });
    }

    pub fn set_game_number(&self, user: &str, game_number: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .users
            .entry(UserId(user.to_string()))
            .or_default()
            .game_number = game_number;
    }

    /// Current `(status, area, room, slot)` of a user, for assertions.
    pub fn origin_of(&self, user: &str) -> Option<(i32, i32, u16, u16)> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .get(&UserId(user.to_string()))
            .map(|r| (r.status, r.area, r.room, r.slot))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn user_for_session(
        &self,
        session_key: &str,
    ) -> Result<Option<UserId>, SessionError> {
        Ok(self.inner.lock().unwrap().sessions.get(session_key).cloned())
    }

    async fn handle_available(
        &self,
        handle: &str,
    ) -> Result<bool, SessionError> {
        let inner = self.inner.lock().unwrap();
        let taken = inner
            .users
            .values()
            .flat_map(|r| r.pairs.iter())
            .any(|p| p.handle == handle);
        Ok(!taken)
    }

    async fn insert_pair(
        &self,
        user: &UserId,
        pair: &StoredPair,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .users
            .entry(user.clone())
            .or_default()
            .pairs
            .push(pair.clone());
        Ok(())
    }

    async fn update_pair(
        &self,
        user: &UserId,
        pair: &StoredPair,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.users.get_mut(user) {
            if let Some(existing) =
                record.pairs.iter_mut().find(|p| p.handle == pair.handle)
            {
                existing.nickname = pair.nickname.clone();
            }
        }
        Ok(())
    }

    async fn update_origin(
        &self,
        user: &UserId,
        status: OnlineStatus,
        area: i32,
        room: u16,
        slot: u16,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.users.entry(user.clone()).or_default();
        record.status = status.as_i32();
        record.area = area;
        record.room = room;
        record.slot = slot;
        Ok(())
    }

    async fn update_game_number(
        &self,
        user: &UserId,
        game_number: u32,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().unwrap();
        inner.users.entry(user.clone()).or_default().game_number =
            game_number;
        Ok(())
    }

    async fn game_number(&self, user: &UserId) -> Result<u32, SessionError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .get(user)
            .map(|r| r.game_number)
            .unwrap_or(0))
    }

    async fn motd(&self) -> Result<Option<String>, SessionError> {
        Ok(self.inner.lock().unwrap().motd.clone())
    }

    async fn stored_pairs(
        &self,
        user: &UserId,
    ) -> Result<Vec<StoredPair>, SessionError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .get(user)
            .map(|r| r.pairs.iter().take(3).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId(s.to_string())
    }

    #[tokio::test]
    async fn test_user_for_session_hit_and_miss() {
        let store = MemoryStore::new();
        store.add_session("12345678", "user-1");

        let hit = store.user_for_session("12345678").await.unwrap();
        assert_eq!(hit, Some(uid("user-1")));

        let miss = store.user_for_session("00000000").await.unwrap();
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn test_handle_available_reflects_inserts() {
        let store = MemoryStore::new();
        assert!(store.handle_available("ABC123").await.unwrap());

        store
            .insert_pair(
                &uid("user-1"),
                &StoredPair {
                    handle: "ABC123".into(),
                    nickname: b"nick".to_vec(),
                },
            )
            .await
            .unwrap();
        assert!(!store.handle_available("ABC123").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_pair_refreshes_nickname_only() {
        let store = MemoryStore::new();
        let pair = StoredPair {
            handle: "ABC123".into(),
            nickname: b"old".to_vec(),
        };
        store.insert_pair(&uid("u"), &pair).await.unwrap();
        store
            .update_pair(
                &uid("u"),
                &StoredPair {
                    handle: "ABC123".into(),
                    nickname: b"new".to_vec(),
                },
            )
            .await
            .unwrap();

        let pairs = store.stored_pairs(&uid("u")).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].nickname, b"new");
    }

    #[tokio::test]
    async fn test_stored_pairs_caps_at_three() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.add_pair("u", &format!("HAND{i}0"), b"n");
        }
        assert_eq!(store.stored_pairs(&uid("u")).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_origin_persists_coordinates() {
        let store = MemoryStore::new();
        store
            .update_origin(&uid("u"), OnlineStatus::Lobby, 1, 2, 3)
            .await
            .unwrap();
        assert_eq!(store.origin_of("u"), Some((1, 1, 2, 3)));

        store
            .update_origin(&uid("u"), OnlineStatus::Offline, -1, 0, 0)
            .await
            .unwrap();
        assert_eq!(store.origin_of("u"), Some((0, -1, 0, 0)));
    }

    #[tokio::test]
    async fn test_game_number_defaults_to_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.game_number(&uid("nobody")).await.unwrap(), 0);

        store.set_game_number("u", 7);
        assert_eq!(store.game_number(&uid("u")).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_motd_unset_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.motd().await.unwrap(), None);
        store.set_motd("welcome back");
        assert_eq!(store.motd().await.unwrap().unwrap(), "welcome back");
    }
}
