//! FIFO of players waiting for an opponent, backed by the external
//! coordination store so several server instances can share one queue.
//! Everything except `pair_pop` is a thin wrapper over a Redis list;
//! `pair_pop` has to be atomic across instances, so it runs as a single
//! server-side Lua script rather than a get-then-set round trip from the
//! client, the same reasoning that motivates `redis::Script` wherever a
//! read-modify-write needs to be indivisible against concurrent callers.
//!
//! [`MatchQueueClient`] is the interface [`crate::hub::Hub`] depends on, so
//! its matchmaking handlers can be unit-tested against an in-memory double
//! instead of a live coordination store; [`RedisMatchQueue`] is the only
//! production implementation.

use std::collections::VecDeque;
use std::sync::Mutex;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::error::MatchQueueError;

const QUEUE_KEY: &str = "pong:matchqueue";

/// Pops the two oldest entries atomically. If fewer than two are queued,
/// puts back whatever it popped and returns an empty array so a half-pop
/// never strands a waiting player.
const PAIR_POP_SCRIPT: &str = r#"
local a = redis.call('LPOP', KEYS[1])
if not a then
    return {}
end
local b = redis.call('LPOP', KEYS[1])
if not b then
    redis.call('LPUSH', KEYS[1], a)
    return {}
end
return {a, b}
"#;

pub trait MatchQueueClient: Send + Sync {
    fn enqueue(&self, player_id: &str) -> impl std::future::Future<Output = Result<(), MatchQueueError>> + Send;
    fn remove(&self, player_id: &str) -> impl std::future::Future<Output = Result<(), MatchQueueError>> + Send;
    fn pair_pop(&self) -> impl std::future::Future<Output = Result<Option<(String, String)>, MatchQueueError>> + Send;
    fn depth(&self) -> impl std::future::Future<Output = Result<i64, MatchQueueError>> + Send;
}

pub struct RedisMatchQueue {
    conn: ConnectionManager,
    pair_pop_script: Script,
}

impl RedisMatchQueue {
    pub async fn connect(url: &str) -> Result<Self, MatchQueueError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(RedisMatchQueue { conn, pair_pop_script: Script::new(PAIR_POP_SCRIPT) })
    }

    /// Cheap reachability probe for the health surface.
    pub async fn ping(&self) -> Result<(), MatchQueueError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

impl MatchQueueClient for RedisMatchQueue {
    async fn enqueue(&self, player_id: &str) -> Result<(), MatchQueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(QUEUE_KEY, player_id).await?;
        Ok(())
    }

    /// Removes every occurrence of `player_id` from the queue (a player
    /// may have been enqueued more than once before a duplicate join was
    /// noticed).
    async fn remove(&self, player_id: &str) -> Result<(), MatchQueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lrem(QUEUE_KEY, 0, player_id).await?;
        Ok(())
    }

    async fn pair_pop(&self) -> Result<Option<(String, String)>, MatchQueueError> {
        let mut conn = self.conn.clone();
        let popped: Vec<String> = self
            .pair_pop_script
            .key(QUEUE_KEY)
            .invoke_async(&mut conn)
            .await?;
        match popped.len() {
            0 => Ok(None),
            2 => Ok(Some((popped[0].clone(), popped[1].clone()))),
            _ => Err(MatchQueueError::NotAtomic),
        }
    }

    async fn depth(&self) -> Result<i64, MatchQueueError> {
        let mut conn = self.conn.clone();
        let depth: i64 = conn.llen(QUEUE_KEY).await?;
        Ok(depth)
    }
}

/// In-process FIFO used in place of [`RedisMatchQueue`] in unit tests, so
/// `Hub`'s matchmaking handlers can be exercised without a live
/// coordination store. Not wired into `main.rs`.
#[derive(Default)]
pub struct InMemoryMatchQueue {
    queue: Mutex<VecDeque<String>>,
}

impl MatchQueueClient for InMemoryMatchQueue {
    async fn enqueue(&self, player_id: &str) -> Result<(), MatchQueueError> {
        self.queue.lock().unwrap().push_back(player_id.to_string());
        Ok(())
    }

    async fn remove(&self, player_id: &str) -> Result<(), MatchQueueError> {
        self.queue.lock().unwrap().retain(|p| p != player_id);
        Ok(())
    }

    async fn pair_pop(&self) -> Result<Option<(String, String)>, MatchQueueError> {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() < 2 {
            return Ok(None);
        }
        let a = queue.pop_front().unwrap();
        let b = queue.pop_front().unwrap();
        Ok(Some((a, b)))
    }

    async fn depth(&self) -> Result<i64, MatchQueueError> {
        Ok(self.queue.lock().unwrap().len() as i64)
    }
}
