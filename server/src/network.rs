//! UDP transport: implements [`Broadcaster`] over bincode-framed datagrams
//! and tracks per-connection liveness so idle players are disconnected the
//! same way the teacher's `ClientManager::check_timeouts` retires zombie
//! connections in `network.rs`/`client_manager.rs`, generalized from
//! numeric client ids to player ids.
//!
//! A player's id IS the string form of its UDP peer address — there is no
//! handshake or authentication layer, matching [`crate::hub::Hub`]'s own
//! assumption that connection id doubles as player id.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::RwLock;

use shared::{Packet, PlayerId};

use crate::broadcaster::{Broadcaster, SendError};
use crate::hub::Hub;
use crate::match_queue::MatchQueueClient;

const RECV_BUFFER_SIZE: usize = 2048;
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
const TIMEOUT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        log::info!("udp transport listening on {addr}");
        Ok(UdpTransport { socket: Arc::new(socket) })
    }

    pub fn socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }
}

impl Broadcaster for UdpTransport {
    async fn send_raw(&self, connection_id: &str, packet: &Packet) -> Result<(), SendError> {
        let addr: SocketAddr = connection_id
            .parse()
            .map_err(|_| SendError(format!("invalid connection id {connection_id}")))?;
        let bytes = bincode::serialize(packet).map_err(|e| SendError(format!("serialize failed: {e}")))?;
        self.socket.send_to(&bytes, addr).await.map_err(|e| SendError(format!("send_to failed: {e}")))?;
        Ok(())
    }
}

/// Tracks the last time each player's socket was heard from, so a periodic
/// task can evict connections that silently vanished (the normal UDP case —
/// there is no FIN).
pub struct ConnectionTracker {
    last_seen: RwLock<HashMap<PlayerId, Instant>>,
    timeout: Duration,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        ConnectionTracker { last_seen: RwLock::new(HashMap::new()), timeout: CONNECTION_TIMEOUT }
    }

    async fn touch(&self, player_id: &str) {
        self.last_seen.write().await.insert(player_id.to_string(), Instant::now());
    }

    async fn forget(&self, player_id: &str) {
        self.last_seen.write().await.remove(player_id);
    }

    async fn timed_out(&self) -> Vec<PlayerId> {
        let now = Instant::now();
        self.last_seen
            .read()
            .await
            .iter()
            .filter(|(_, seen)| now.duration_since(**seen) > self.timeout)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the receive loop until the socket errors out. Each datagram's
/// sender address is the player id; valid packets are dispatched to `hub`
/// and refresh the player's liveness timestamp.
pub async fn run_receive_loop<B, Q>(socket: Arc<UdpSocket>, tracker: Arc<ConnectionTracker>, hub: Arc<Hub<B, Q>>)
where
    B: Broadcaster + 'static,
    Q: MatchQueueClient + 'static,
{
    let mut buffer = [0u8; RECV_BUFFER_SIZE];
    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((len, addr)) => {
                let player_id = addr.to_string();
                match bincode::deserialize::<Packet>(&buffer[..len]) {
                    Ok(packet) => {
                        tracker.touch(&player_id).await;
                        hub.handle(player_id, packet).await;
                    }
                    Err(e) => log::warn!("udp: dropping undecodable packet from {addr}: {e}"),
                }
            }
            Err(e) => {
                log::error!("udp: recv_from failed: {e}");
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Periodically evicts connections that haven't sent a packet within the
/// tracker's timeout window, notifying `hub` the same way an explicit
/// disconnect would.
pub async fn run_timeout_checker<B, Q>(tracker: Arc<ConnectionTracker>, hub: Arc<Hub<B, Q>>)
where
    B: Broadcaster + 'static,
    Q: MatchQueueClient + 'static,
{
    let mut interval = tokio::time::interval(TIMEOUT_CHECK_INTERVAL);
    loop {
        interval.tick().await;
        for player_id in tracker.timed_out().await {
            log::info!("udp: {player_id} timed out, disconnecting");
            tracker.forget(&player_id).await;
            hub.on_disconnect(player_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_raw_rejects_non_socket_connection_id() {
        let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let err = transport.send_raw("not-an-address", &Packet::KeepAlive).await.unwrap_err();
        assert!(err.0.contains("invalid connection id"));
    }

    #[tokio::test]
    async fn send_raw_delivers_a_bincode_frame() {
        let server = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client_addr = client.local_addr().unwrap().to_string();

        server.send_raw(&client_addr, &Packet::KeepAlive).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        let packet: Packet = bincode::deserialize(&buf[..len]).unwrap();
        assert!(matches!(packet, Packet::KeepAlive));
    }

    #[tokio::test]
    async fn tracker_reports_and_forgets_timed_out_connections() {
        let mut tracker = ConnectionTracker::new();
        tracker.timeout = Duration::from_millis(1);
        tracker.touch("alice").await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let timed_out = tracker.timed_out().await;
        assert_eq!(timed_out, vec!["alice".to_string()]);

        tracker.forget("alice").await;
        assert!(tracker.timed_out().await.is_empty());
    }
}
