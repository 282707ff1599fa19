//! One handler per inbound message, dispatched by connection id (which
//! doubles as player id — authentication is out of scope here). Mirrors
//! the teacher's `handle_packet` match-arm dispatch in `network.rs`,
//! adapted to the matchmaking/paddle-input/ready/disconnect message set
//! and to this crate's MatchQueue/SessionStore/InputCache/Broadcaster
//! collaborators instead of a single shared `GameState`.
//!
//! No handler holds a session lock across a `Broadcaster::send` call —
//! every handler extracts what it needs inside a short lock scope, drops
//! the guard, then persists via `SessionStore::update` and broadcasts.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use shared::{MatchFoundInfo, Packet, PlayerId};
use uuid::Uuid;

use crate::broadcaster::Broadcaster;
use crate::input_cache::InputCache;
use crate::match_queue::MatchQueueClient;
use crate::session_store::{Session, SessionStore};

pub struct Hub<B: Broadcaster, Q: MatchQueueClient> {
    session_store: Arc<SessionStore>,
    input_cache: Arc<InputCache>,
    match_queue: Arc<Q>,
    broadcaster: Arc<B>,
}

impl<B: Broadcaster, Q: MatchQueueClient> Hub<B, Q> {
    pub fn new(
        session_store: Arc<SessionStore>,
        input_cache: Arc<InputCache>,
        match_queue: Arc<Q>,
        broadcaster: Arc<B>,
    ) -> Self {
        Hub { session_store, input_cache, match_queue, broadcaster }
    }

    pub async fn handle(&self, player_id: PlayerId, packet: Packet) {
        match packet {
            Packet::JoinMatchmaking => self.join_matchmaking(player_id).await,
            Packet::StartBotMatch => self.start_bot_match(player_id).await,
            Packet::SendPaddleInput { target_y } => {
                self.send_paddle_input(player_id, target_y).await
            }
            Packet::RequestStartGame => self.request_start_game(player_id).await,
            Packet::KeepAlive => self.keep_alive(player_id).await,
            other => {
                log::debug!("hub: dropping unexpected inbound packet from {player_id}: {other:?}");
            }
        }
    }

    async fn join_matchmaking(&self, player_id: PlayerId) {
        if self.session_store.get_by_player(&player_id).await.is_some() {
            self.broadcaster.send(&player_id, &Packet::AlreadyInGame).await;
            return;
        }

        if let Err(e) = self.match_queue.enqueue(&player_id).await {
            log::warn!("matchmaking enqueue failed for {player_id}: {e}");
            return;
        }

        match self.match_queue.pair_pop().await {
            Ok(Some((a, b))) => {
                let session = Session::new(a.clone(), b.clone());
                if let Err(e) = self.session_store.create(session).await {
                    log::warn!("session create failed after pair-pop ({a}, {b}): {e}");
                    return;
                }
                self.broadcaster
                    .send(&a, &Packet::MatchFound(MatchFoundInfo { opponent: b.clone(), side: 1, is_bot: false }))
                    .await;
                self.broadcaster
                    .send(&b, &Packet::MatchFound(MatchFoundInfo { opponent: a, side: 2, is_bot: false }))
                    .await;
            }
            Ok(None) => {
                self.broadcaster.send(&player_id, &Packet::WaitingForOpponent).await;
            }
            Err(e) => log::warn!("pair-pop failed: {e}"),
        }
    }

    async fn start_bot_match(&self, player_id: PlayerId) {
        if self.session_store.get_by_player(&player_id).await.is_some() {
            self.broadcaster.send(&player_id, &Packet::AlreadyInGame).await;
            return;
        }

        let bot_id = format!("bot_{}", Uuid::new_v4());
        let mut session = Session::new(player_id.clone(), bot_id);
        session.state.left_ready = true;
        session.state.right_ready = true;

        if let Err(e) = self.session_store.create(session).await {
            log::warn!("bot session create failed for {player_id}: {e}");
            return;
        }

        self.broadcaster
            .send(&player_id, &Packet::MatchFound(MatchFoundInfo { opponent: "Bot".into(), side: 1, is_bot: true }))
            .await;
    }

    async fn send_paddle_input(&self, player_id: PlayerId, target_y: f32) {
        let clamped_y = self.input_cache.put(&player_id, target_y).await;

        let Some(session_arc) = self.session_store.get_by_player(&player_id).await else {
            return;
        };
        let opponent = {
            let session = session_arc.lock().await;
            if session.player1_id == player_id {
                Some(session.player2_id.clone()).filter(|_| !session.is_bot_opponent())
            } else {
                Some(session.player1_id.clone())
            }
        };
        if let Some(opponent_id) = opponent {
            self.broadcaster
                .send(&opponent_id, &Packet::OpponentPaddleInput { target_y: clamped_y })
                .await;
        }
    }

    async fn request_start_game(&self, player_id: PlayerId) {
        let Some(session_arc) = self.session_store.get_by_player(&player_id).await else {
            return;
        };

        let (session_copy, just_started) = {
            let mut guard = session_arc.lock().await;
            let was_ready = guard.state.players_ready();
            if guard.player1_id == player_id {
                guard.state.left_ready = true;
            } else if guard.player2_id == player_id {
                guard.state.right_ready = true;
            }
            let now_ready = guard.state.players_ready();
            (guard.clone(), !was_ready && now_ready)
        };

        self.session_store.update(session_copy.clone()).await;

        if just_started {
            self.broadcaster.send(&session_copy.player1_id, &Packet::GameStarted).await;
            if !session_copy.is_bot_opponent() {
                self.broadcaster.send(&session_copy.player2_id, &Packet::GameStarted).await;
            }
        }
    }

    async fn keep_alive(&self, player_id: PlayerId) {
        let utc_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.broadcaster.send(&player_id, &Packet::Pong { utc_timestamp }).await;
    }

    /// Triggered by the transport's connection-timeout detection, not by
    /// an inbound message — UDP has no explicit disconnect frame. Removing
    /// the session after handling makes this naturally idempotent: a
    /// second call (e.g. an explicit disconnect racing a timeout) finds no
    /// session and is a no-op.
    pub async fn on_disconnect(&self, player_id: PlayerId) {
        if let Err(e) = self.match_queue.remove(&player_id).await {
            log::warn!("matchmaking removal on disconnect failed for {player_id}: {e}");
        }

        let Some(session_arc) = self.session_store.get_by_player(&player_id).await else {
            return;
        };

        let session_copy = {
            let mut guard = session_arc.lock().await;
            if guard.state.game_over {
                return;
            }
            guard.state.game_over = true;
            guard.state.winner = if guard.player1_id == player_id { 2 } else { 1 };
            guard.clone()
        };

        self.session_store.update(session_copy.clone()).await;

        let opponent_id = if session_copy.player1_id == player_id {
            session_copy.player2_id.clone()
        } else {
            session_copy.player1_id.clone()
        };
        if !opponent_id.starts_with("bot_") {
            self.broadcaster
                .send(&opponent_id, &Packet::OpponentDisconnected(session_copy.state.clone()))
                .await;
        }

        self.session_store.remove(&session_copy.session_id).await;
        log::info!("session {} ended by disconnect of {player_id}", session_copy.session_id);
    }
}
