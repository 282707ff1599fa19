//! In-memory registry of active sessions, the only component that owns a
//! live [`Session`]. Generalizes the teacher's `ClientManager` registry
//! pattern (a `HashMap` of connections behind one lock, with a derived
//! lookup) to a dual-keyed store: sessions are addressed by session id
//! directly by the Scheduler, and by player id by the Hub.
//!
//! Lock ordering follows the rule in the concurrency model: a session's
//! own lock is always acquired before (never while holding) the store's
//! index lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

use shared::{GameState, PlayerId};

use crate::error::SessionStoreError;

/// One pairing of two participants and their authoritative round state.
/// `player2_id` may be a synthetic `"bot_"`-prefixed id with no connection
/// behind it.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    pub state: GameState,
    pub last_update_time: Instant,
    pub last_client_sync: Instant,
}

impl Session {
    pub fn new(player1_id: PlayerId, player2_id: PlayerId) -> Self {
        let session_id = derive_session_id(&player1_id, &player2_id);
        let now = Instant::now();
        Session {
            session_id,
            player1_id,
            player2_id,
            state: GameState::new(),
            last_update_time: now,
            last_client_sync: now,
        }
    }

    pub fn is_bot_opponent(&self) -> bool {
        self.player2_id.starts_with("bot_")
    }
}

/// Deterministic from the lexicographically ordered pair of player ids, so
/// two clients racing to create the same session land on the same id.
pub fn derive_session_id(player1_id: &str, player2_id: &str) -> String {
    if player1_id <= player2_id {
        format!("{player1_id}:{player2_id}")
    } else {
        format!("{player2_id}:{player1_id}")
    }
}

struct Slot {
    session: Arc<Mutex<Session>>,
}

pub struct SessionStore {
    by_session_id: RwLock<HashMap<String, Slot>>,
    by_player_id: RwLock<HashMap<PlayerId, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore {
            by_session_id: RwLock::new(HashMap::new()),
            by_player_id: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self, session: Session) -> Result<(), SessionStoreError> {
        let mut by_player = self.by_player_id.write().await;
        if by_player.contains_key(&session.player1_id) {
            return Err(SessionStoreError::SessionAlreadyExists(session.player1_id));
        }
        if !session.is_bot_opponent() && by_player.contains_key(&session.player2_id) {
            return Err(SessionStoreError::SessionAlreadyExists(session.player2_id));
        }

        let session_id = session.session_id.clone();
        by_player.insert(session.player1_id.clone(), session_id.clone());
        if !session.is_bot_opponent() {
            by_player.insert(session.player2_id.clone(), session_id.clone());
        }
        drop(by_player);

        let mut by_session = self.by_session_id.write().await;
        by_session.insert(session_id, Slot { session: Arc::new(Mutex::new(session)) });
        Ok(())
    }

    pub async fn get_by_player(&self, player_id: &str) -> Option<Arc<Mutex<Session>>> {
        let session_id = {
            let by_player = self.by_player_id.read().await;
            by_player.get(player_id).cloned()?
        };
        self.get_by_id(&session_id).await
    }

    pub async fn get_by_id(&self, session_id: &str) -> Option<Arc<Mutex<Session>>> {
        let by_session = self.by_session_id.read().await;
        by_session.get(session_id).map(|slot| slot.session.clone())
    }

    /// Replace the stored session wholesale. No-op if the session no
    /// longer exists (e.g. it was removed concurrently).
    pub async fn update(&self, session: Session) {
        let by_session = self.by_session_id.read().await;
        if let Some(slot) = by_session.get(&session.session_id) {
            let mut guard = slot.session.lock().await;
            *guard = session;
        }
    }

    pub async fn remove(&self, session_id: &str) {
        let mut by_session = self.by_session_id.write().await;
        let Some(slot) = by_session.remove(session_id) else {
            return;
        };
        drop(by_session);

        let session = slot.session.lock().await;
        let mut by_player = self.by_player_id.write().await;
        by_player.remove(&session.player1_id);
        by_player.remove(&session.player2_id);
    }

    /// Caller-owned copy of every live session, safe to iterate without
    /// holding any store lock.
    pub async fn snapshot(&self) -> Vec<Session> {
        let by_session = self.by_session_id.read().await;
        let mut out = Vec::with_capacity(by_session.len());
        for slot in by_session.values() {
            out.push(slot.session.lock().await.clone());
        }
        out
    }

    pub async fn count(&self) -> usize {
        let by_session = self.by_session_id.read().await;
        let mut active = 0;
        for slot in by_session.values() {
            if !slot.session.lock().await.state.game_over {
                active += 1;
            }
        }
        active
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_order_independent() {
        assert_eq!(derive_session_id("alice", "bob"), derive_session_id("bob", "alice"));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_player() {
        let store = SessionStore::new();
        store.create(Session::new("a".into(), "b".into())).await.unwrap();
        let err = store.create(Session::new("a".into(), "c".into())).await.unwrap_err();
        assert!(matches!(err, SessionStoreError::SessionAlreadyExists(_)));
    }

    #[tokio::test]
    async fn get_by_player_finds_session_by_either_side() {
        let store = SessionStore::new();
        store.create(Session::new("a".into(), "b".into())).await.unwrap();
        assert!(store.get_by_player("a").await.is_some());
        assert!(store.get_by_player("b").await.is_some());
        assert!(store.get_by_player("c").await.is_none());
    }

    #[tokio::test]
    async fn remove_clears_both_player_indices() {
        let store = SessionStore::new();
        store.create(Session::new("a".into(), "b".into())).await.unwrap();
        let session_id = derive_session_id("a", "b");
        store.remove(&session_id).await;
        assert!(store.get_by_player("a").await.is_none());
        assert!(store.get_by_player("b").await.is_none());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn count_excludes_game_over_sessions() {
        let store = SessionStore::new();
        store.create(Session::new("a".into(), "b".into())).await.unwrap();
        assert_eq!(store.count().await, 1);

        let mut session = store.get_by_player("a").await.unwrap().lock().await.clone();
        session.state.game_over = true;
        store.update(session).await;
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn bot_session_has_no_player_index_for_the_bot() {
        let store = SessionStore::new();
        store.create(Session::new("a".into(), "bot_123".into())).await.unwrap();
        assert!(store.get_by_player("a").await.is_some());
        assert!(store.get_by_player("bot_123").await.is_none());
    }

    #[tokio::test]
    async fn snapshot_is_independent_of_live_mutation() {
        let store = SessionStore::new();
        store.create(Session::new("a".into(), "b".into())).await.unwrap();
        let snap = store.snapshot().await;
        assert_eq!(snap.len(), 1);

        let mut session = snap[0].clone();
        session.state.left_score = 99;
        // Mutating the snapshot copy must not affect the stored session.
        let stored = store.get_by_player("a").await.unwrap();
        assert_eq!(stored.lock().await.state.left_score, 0);
    }
}
