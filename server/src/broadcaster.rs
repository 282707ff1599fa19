//! Fan-out of one outbound message to one connection. `Broadcaster` holds
//! no state of its own — the transport owns connection handles — so the
//! retry/backoff policy lives here once, generically, and each concrete
//! transport only has to implement a single fallible one-shot send.
//!
//! Mirrors the teacher's `send_packet`/`broadcast_packet` queue-based,
//! non-blocking sends in `network.rs`, generalized behind a trait so the
//! Scheduler and Hub never depend on the concrete transport.

use std::time::Duration;

use shared::Packet;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_MS: [u64; 2] = [100, 200];

/// One best-effort attempt to deliver `packet` to `connection_id` failed.
#[derive(Debug)]
pub struct SendError(pub String);

/// A transport capable of addressing a single connection by id. Supplied
/// by `network` in production; tests use an in-memory recorder.
pub trait Broadcaster: Send + Sync {
    /// One-shot, fallible delivery attempt. Implementors should not retry
    /// internally — [`send`](Broadcaster::send) owns the retry policy.
    fn send_raw(
        &self,
        connection_id: &str,
        packet: &Packet,
    ) -> impl std::future::Future<Output = Result<(), SendError>> + Send;

    /// Best-effort, fire-and-forget send with bounded retry (at most
    /// [`MAX_ATTEMPTS`], backing off 100ms then 200ms). Drops and logs on
    /// persistent failure — the caller never awaits a guarantee here; the
    /// Scheduler's next broadcast supersedes a lost message.
    fn send(
        &self,
        connection_id: &str,
        packet: &Packet,
    ) -> impl std::future::Future<Output = ()> + Send {
        async move {
            for attempt in 0..MAX_ATTEMPTS {
                match self.send_raw(connection_id, packet).await {
                    Ok(()) => return,
                    Err(e) => {
                        log::warn!(
                            "broadcast to {connection_id} failed (attempt {}/{MAX_ATTEMPTS}): {}",
                            attempt + 1,
                            e.0
                        );
                        if let Some(&delay) = BACKOFF_MS.get(attempt as usize) {
                            tokio::time::sleep(Duration::from_millis(delay)).await;
                        }
                    }
                }
            }
            log::warn!("dropping message to {connection_id} after {MAX_ATTEMPTS} attempts");
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Records every packet handed to it; never fails. Used by `hub` and
    /// `scheduler` unit tests so they don't need a real socket.
    #[derive(Default)]
    pub struct RecordingBroadcaster {
        pub sent: Mutex<Vec<(String, Packet)>>,
    }

    impl Broadcaster for RecordingBroadcaster {
        async fn send_raw(&self, connection_id: &str, packet: &Packet) -> Result<(), SendError> {
            self.sent.lock().unwrap().push((connection_id.to_string(), packet.clone()));
            Ok(())
        }
    }
}
