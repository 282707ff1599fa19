//! Per-player latest-wins paddle target, with a bounded TTL so a player who
//! drops without disconnecting cleanly doesn't leave a stale input wedged
//! forever. Writes are a single `HashMap` insert under a `tokio::sync::
//! RwLock`, so they never block a concurrent read for long — the same
//! design the teacher's `ClientManager` used for its pending-input queues,
//! simplified from a queue to a single slot since only the newest value
//! matters here.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use shared::{FIELD_H, INPUT_TTL_MS, PADDLE_H};

struct Entry {
    target_y: f32,
    received_at: Instant,
}

pub struct InputCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl InputCache {
    pub fn new() -> Self {
        InputCache {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_millis(INPUT_TTL_MS),
        }
    }

    /// Clamp `target_y` to the paddle's legal range and store it as the
    /// player's latest input, overwriting any prior value. Returns the
    /// clamped value so callers forwarding it on (e.g. to the opponent)
    /// never leak an out-of-range input onto the wire.
    pub async fn put(&self, player_id: &str, target_y: f32) -> f32 {
        let clamped = target_y.clamp(0.0, FIELD_H - PADDLE_H);
        let mut entries = self.entries.write().await;
        entries.insert(
            player_id.to_string(),
            Entry { target_y: clamped, received_at: Instant::now() },
        );
        clamped
    }

    /// Read both players' latest targets in one lock acquisition. An entry
    /// older than the TTL is treated as absent (but is not evicted here —
    /// [`Self::sweep_expired`] does that opportunistically).
    pub async fn take(&self, player1_id: &str, player2_id: &str) -> (Option<f32>, Option<f32>) {
        let entries = self.entries.read().await;
        let now = Instant::now();
        let fresh = |id: &str| -> Option<f32> {
            entries.get(id).and_then(|e| {
                if now.duration_since(e.received_at) < self.ttl {
                    Some(e.target_y)
                } else {
                    None
                }
            })
        };
        (fresh(player1_id), fresh(player2_id))
    }

    /// Drop entries past their TTL. Called periodically by the scheduler;
    /// not required for correctness (`take` already ignores stale entries)
    /// but keeps the map from growing unboundedly across disconnects.
    pub async fn sweep_expired(&self) {
        let ttl = self.ttl;
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, e| now.duration_since(e.received_at) < ttl);
    }
}

impl Default for InputCache {
    fn default() -> Self {
        Self::new()
    }
}
